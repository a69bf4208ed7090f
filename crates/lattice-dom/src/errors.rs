use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DomError {
    #[error("dom parse failed, fell back to regex extraction: {0}")]
    ParseFallback(String),
}
