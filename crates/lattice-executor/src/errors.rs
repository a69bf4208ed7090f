use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ExecutorError {
    #[error("unknown command type dropped: {0}")]
    UnknownCommandType(String),
    #[error("candidate_id {0} did not resolve in the governing PageContext")]
    UnresolvedCandidate(u32),
}
