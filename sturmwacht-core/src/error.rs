use reqwest::StatusCode;

/// Failures of a weather fetch.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather API request failed with status {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("Failed to parse weather payload: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures of a chat completion call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API-Key nicht konfiguriert")]
    MissingApiKey,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("malformed upstream payload: {0}")]
    MalformedPayload(String),
}

/// Shortens an upstream body for error messages, respecting char boundaries.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
