use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing API key for LLM provider")]
    MissingApiKey,
    #[error("LLM request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("LLM returned a non-success status {status}: {body}")]
    BadStatus { status: u16, body: String },
    #[error("LLM response missing a message choice")]
    EmptyResponse,
}
