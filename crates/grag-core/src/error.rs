//! Shared error type for the GRAG workspace

use thiserror::Error;

/// Result alias used across all GRAG crates
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by GRAG components
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration values
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Filesystem failures
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failures
    #[error("serialization error: {0}")]
    Serialization(String),

    /// HTTP transport failures
    #[error("network error: {0}")]
    Network(String),

    /// Failures reported by the language model API
    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    /// Workspace layout problems (missing runs, bad directories)
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Failures launching or running the external indexing engine
    #[error("engine error: {0}")]
    Engine(String),

    /// Request timed out
    #[error("timeout: {0}")]
    Timeout(String),

    /// Anything escaping from the binary boundary
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
