/// Default versioned base URL for Gemini requests.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Builds the SSE streaming endpoint for `model`.
///
/// A blank base falls back to [`DEFAULT_GEMINI_BASE_URL`]; a `models/` prefix on
/// the model id is tolerated.
pub fn stream_generate_content_url(base_url: &str, model: &str) -> String {
    let base = if base_url.trim().is_empty() {
        DEFAULT_GEMINI_BASE_URL
    } else {
        base_url.trim()
    };
    let base = base.trim_end_matches('/');
    let model = model.trim().trim_start_matches("models/");

    format!("{base}/models/{model}:streamGenerateContent?alt=sse")
}
