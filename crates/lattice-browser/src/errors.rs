use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    LaunchFailed(String),
    #[error("navigation failed: {0}")]
    NavigateFailed(String),
    #[error("dom capture failed: {0}")]
    DomCaptureFailed(String),
    #[error("no selector for candidate_id {0} resolved against the page")]
    VerbFailed(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("driver already closed")]
    Closed,
}
