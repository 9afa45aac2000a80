use std::collections::VecDeque;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};

use crate::config::GeminiApiConfig;
use crate::error::{parse_error_message, GeminiApiError};
use crate::events::StreamEvent;
use crate::payload::GenerateContentRequest;
use crate::retry::{is_retryable_http_error, retry_delay, MAX_RETRIES};
use crate::sse::SseStreamParser;
use crate::url::stream_generate_content_url;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiApiClient {
    http: Client,
    config: GeminiApiConfig,
}

impl GeminiApiClient {
    pub fn new(config: GeminiApiConfig) -> Result<Self, GeminiApiError> {
        if config.api_key.trim().is_empty() {
            return Err(GeminiApiError::MissingApiKey);
        }
        if config.model.trim().is_empty() {
            return Err(GeminiApiError::MissingModel);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiApiConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        stream_generate_content_url(&self.config.base_url, &self.config.model)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, GeminiApiError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(self.config.api_key.trim())
            .map_err(|_| GeminiApiError::InvalidHeader(API_KEY_HEADER.to_string()))?;
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub fn build_request(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<reqwest::RequestBuilder, GeminiApiError> {
        let headers = self.build_headers()?;
        Ok(self.http.post(self.endpoint()).headers(headers).json(request))
    }

    pub async fn send_with_retry(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<Response, GeminiApiError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            match self.build_request(request)?.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    last_status = Some(status);
                    let body = response.text().await.unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < MAX_RETRIES && is_retryable_http_error(status.as_u16(), &body) {
                        tracing::warn!(%status, attempt, "retrying Gemini request");
                        tokio::time::sleep(retry_delay(attempt)).await;
                        continue;
                    }

                    return Err(GeminiApiError::Status(status, message));
                }
                Err(error) => {
                    let message = error.to_string();
                    last_error = Some(message);
                    if attempt < MAX_RETRIES && !error.is_builder() {
                        tracing::warn!(%error, attempt, "retrying Gemini request after transport error");
                        tokio::time::sleep(retry_delay(attempt)).await;
                        continue;
                    }
                    return Err(GeminiApiError::RetryExhausted {
                        status: last_status,
                        last_error,
                    });
                }
            }
        }

        Err(GeminiApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Sends `request` and returns the open event stream.
    pub async fn open_stream(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateStream, GeminiApiError> {
        let response = self.send_with_retry(request).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();

        Ok(GenerateStream::new(bytes))
    }
}

/// Open streaming response, consumed one event at a time.
pub struct GenerateStream {
    bytes: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    parser: SseStreamParser,
    pending: VecDeque<StreamEvent>,
    exhausted: bool,
}

impl GenerateStream {
    fn new(bytes: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>) -> Self {
        Self {
            bytes,
            parser: SseStreamParser::default(),
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Returns the next event, or `None` once the body is exhausted.
    ///
    /// Embedded `error` payloads surface as [`GeminiApiError::StreamFailed`].
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, GeminiApiError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(match event {
                    StreamEvent::Error { message } => Err(GeminiApiError::StreamFailed(message)),
                    event => Ok(event),
                });
            }

            if self.exhausted {
                return None;
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => self.pending.extend(self.parser.feed(&chunk)),
                Some(Err(error)) => {
                    self.exhausted = true;
                    return Some(Err(GeminiApiError::Request(error)));
                }
                None => {
                    self.exhausted = true;
                    self.pending.extend(self.parser.finish());
                }
            }
        }
    }
}

impl std::fmt::Debug for GenerateStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateStream")
            .field("pending", &self.pending.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn stream_of(chunks: Vec<&'static str>) -> GenerateStream {
        let bytes = stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, reqwest::Error>(chunk.as_bytes().to_vec())),
        )
        .boxed();
        GenerateStream::new(bytes)
    }

    #[tokio::test]
    async fn generate_stream_yields_events_across_chunk_boundaries() {
        let mut stream = stream_of(vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n\ndata: {\"cand",
            "idates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]},\"finishReason\":\"STOP\"}]}",
        ]);

        let mut events = Vec::new();
        while let Some(event) = stream.next_event().await {
            events.push(event.expect("no stream error"));
        }

        assert_eq!(
            events,
            vec![
                StreamEvent::Text("Hel".to_string()),
                StreamEvent::Text("lo".to_string()),
                StreamEvent::Finished {
                    reason: "STOP".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn generate_stream_surfaces_embedded_errors() {
        let mut stream = stream_of(vec![
            "data: {\"error\":{\"code\":500,\"message\":\"internal\"}}\n\n",
        ]);

        let event = stream.next_event().await.expect("one event");
        assert!(matches!(event, Err(GeminiApiError::StreamFailed(message)) if message == "internal"));
        assert!(stream.next_event().await.is_none());
    }
}
