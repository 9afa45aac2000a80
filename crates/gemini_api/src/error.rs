use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeminiApiError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("model id is required")]
    MissingModel,

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("stream failed: {0}")]
    StreamFailed(String),

    #[error("retry exhausted after max attempts (status: {}, last_error: {last_error:?})", display_status(.status))]
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },

    #[error("{0}")]
    Unknown(String),
}

fn display_status(status: &Option<StatusCode>) -> String {
    status
        .map(|status| status.as_u16().to_string())
        .unwrap_or_else(|| "n/a".to_owned())
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub status: Option<String>,
}

/// Extracts a readable message from a Gemini error body.
///
/// Gemini wraps failures as `{"error": {"code", "message", "status"}}`; bodies
/// that do not parse are returned verbatim, and empty ones fall back to the
/// HTTP reason phrase.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    let Ok(parsed) = serde_json::from_str::<ErrorPayload>(body) else {
        return fallback();
    };

    let Some(error) = parsed.error else {
        return fallback();
    };

    match (error.message.filter(|m| !m.is_empty()), error.status) {
        (Some(message), Some(code)) if !code.is_empty() => format!("{message} ({code})"),
        (Some(message), _) => message,
        (None, Some(code)) if !code.is_empty() => code,
        _ => fallback(),
    }
}
