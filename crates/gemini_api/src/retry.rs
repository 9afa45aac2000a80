use std::time::Duration;

/// Retries allowed after the first attempt.
pub const MAX_RETRIES: u32 = 3;
pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Canonical status names Gemini reports for transient failures.
const TRANSIENT_STATUSES: [&str; 3] = ["RESOURCE_EXHAUSTED", "UNAVAILABLE", "DEADLINE_EXCEEDED"];

/// Whether a failed response is worth another attempt.
///
/// Gemini sometimes answers a quota or overload condition with a 400 whose
/// body still names the canonical status, so the text is checked too.
pub fn is_retryable_http_error(status: u16, error_text: &str) -> bool {
    if matches!(status, 408 | 429 | 500 | 502 | 503 | 504) {
        return true;
    }

    let normalized = error_text.to_ascii_uppercase().replace(' ', "_");
    TRANSIENT_STATUSES
        .iter()
        .any(|transient| normalized.contains(transient))
        || normalized.contains("OVERLOADED")
}

/// Doubling backoff: 1s, 2s, 4s, ...
pub fn retry_delay(attempt: u32) -> Duration {
    BASE_DELAY.saturating_mul(1u32 << attempt.min(16))
}
