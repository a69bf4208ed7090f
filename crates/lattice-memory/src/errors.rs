use thiserror::Error;

#[derive(Debug, Error)]
pub enum LatticeMemoryError {
    #[error("lattice persistence I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("lattice file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("cannot create a new task while task {0} is still active")]
    TaskAlreadyActive(String),
    #[error("no active task")]
    NoActiveTask,
}
