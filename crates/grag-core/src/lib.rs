//! Core traits and types for GRAG (GraphRAG companion)
//!
//! This crate defines the fundamental traits and types used across the GRAG
//! system: the shared error type, validated request records for the external
//! indexing engine, the workspace layout, chat/embedding provider traits,
//! and the structured search result returned by the query adapters.

pub mod error;
pub mod llm;
pub mod request;
pub mod search;
pub mod workspace;

pub use error::{Error, Result};
pub use llm::{ChatProvider, GenerationConfig, GenerationResult, TextEmbedder};
pub use request::{EmitFormat, IndexingRequest, PromptTuneRequest, Reporter};
pub use search::{ContextTable, SearchResult};
pub use workspace::WorkspaceLayout;
