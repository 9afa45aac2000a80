use serde_json::Value;

use crate::events::{FunctionCall, StreamEvent};

/// Incremental parser for Gemini SSE text streams.
///
/// Bytes are buffered raw and only complete frames are decoded, so a
/// multi-byte character split across network chunks survives intact.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: Vec<u8>,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some((end, delimiter_len)) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + delimiter_len).collect();
            events.extend(parse_frame(&String::from_utf8_lossy(&frame[..end])));
        }

        events
    }

    /// Flushes a trailing frame that was not terminated by a blank line.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let frame = std::mem::take(&mut self.buffer);
        parse_frame(&String::from_utf8_lossy(&frame))
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<StreamEvent> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes());
        events.extend(parser.finish());
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

/// Finds the first blank line (`\n\n` or `\n\r\n`).
///
/// Returns the frame length and the delimiter length after it.
fn find_frame_end(buffer: &[u8]) -> Option<(usize, usize)> {
    buffer
        .iter()
        .enumerate()
        .filter(|(_, byte)| **byte == b'\n')
        .find_map(|(index, _)| match &buffer[index + 1..] {
            [b'\n', ..] => Some((index, 2)),
            [b'\r', b'\n', ..] => Some((index, 3)),
            _ => None,
        })
}

fn parse_frame(frame: &str) -> Vec<StreamEvent> {
    let Some(payload) = extract_data_payload(frame) else {
        return Vec::new();
    };

    if payload == "[DONE]" {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(&payload) {
        Ok(value) => map_chunk(&value),
        Err(error) => {
            tracing::warn!(%error, "discarding malformed SSE payload");
            Vec::new()
        }
    }
}

fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

/// Maps one `GenerateContentResponse` chunk to events in part order.
fn map_chunk(value: &Value) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown stream error")
            .to_string();
        events.push(StreamEvent::Error { message });
        return events;
    }

    if let Some(reason) = value
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        events.push(StreamEvent::Blocked {
            reason: reason.to_string(),
        });
        return events;
    }

    // Only the first candidate is requested and rendered.
    let Some(candidate) = value
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
    else {
        return events;
    };

    let parts = candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array);

    for part in parts.into_iter().flatten() {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            if part.get("thought").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            if !text.is_empty() {
                events.push(StreamEvent::Text(text.to_string()));
            }
        } else if let Some(call) = part.get("functionCall") {
            match serde_json::from_value::<FunctionCall>(call.clone()) {
                Ok(call) => events.push(StreamEvent::FunctionCall(call)),
                Err(error) => events.push(StreamEvent::Error {
                    message: format!("malformed functionCall part: {error}"),
                }),
            }
        }
    }

    if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
        events.push(StreamEvent::from_finish_reason(reason));
    }

    events
}
