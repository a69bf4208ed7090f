use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum PolicyError {
    #[error("malformed navigation url in batch: {0}")]
    InvalidUrl(String),
}
