//! Root error type (spec §7): aggregates every subsystem's own
//! `thiserror` enum behind `#[from]`, built directly on `thiserror`/
//! `anyhow` (see `DESIGN.md` for the dependency rationale).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("browser error: {0}")]
    Browser(#[from] lattice_browser::BrowserError),
    #[error("llm error: {0}")]
    Llm(#[from] lattice_llm::LlmError),
    #[error("lattice persistence error: {0}")]
    Memory(#[from] lattice_memory::LatticeMemoryError),
    #[error("prompt error: {0}")]
    Prompt(#[from] lattice_prompt::PromptError),
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
