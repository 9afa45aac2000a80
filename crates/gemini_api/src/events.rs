use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Model request to run a declared function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Normalized event parsed from one streamed response chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental model text.
    Text(String),
    /// Function call requested by the model; the step ends after the stream does.
    FunctionCall(FunctionCall),
    /// Candidate finished with the given reason (`STOP`, `MAX_TOKENS`, ...).
    Finished { reason: String },
    /// Prompt or candidate was blocked by safety filtering.
    Blocked { reason: String },
    /// Error object embedded in the stream.
    Error { message: String },
}

impl StreamEvent {
    /// Finish reasons that mean the response was withheld.
    pub const BLOCKING_FINISH_REASONS: [&'static str; 5] = [
        "SAFETY",
        "RECITATION",
        "BLOCKLIST",
        "PROHIBITED_CONTENT",
        "SPII",
    ];

    /// Maps a finish reason to `Finished` or `Blocked`.
    pub fn from_finish_reason(reason: &str) -> Self {
        if Self::BLOCKING_FINISH_REASONS.contains(&reason) {
            Self::Blocked {
                reason: reason.to_string(),
            }
        } else {
            Self::Finished {
                reason: reason.to_string(),
            }
        }
    }
}
