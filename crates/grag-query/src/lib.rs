//! Query engine adapters over the external engine's output artifacts
//!
//! Loads the tabular artifacts a prior indexing run produced, then answers
//! queries with two strategies: Global (community-level map/reduce over
//! report summaries) and Local (entity-level mixed context). Both return a
//! structured [`grag_core::SearchResult`].

mod artifacts;
mod client;
mod config;
mod global;
mod local;
mod tokens;

pub use artifacts::{load_optional_table, load_table, tables, ArtifactTable, CellValue};
pub use client::{ChatClient, EmbeddingClient};
pub use config::OpenAiConfig;
pub use global::{CommunityReport, GlobalSearchEngine, GlobalSearchParams};
pub use local::{Claim, Entity, LocalSearchEngine, LocalSearchParams, Relationship, TextUnit};
pub use tokens::approx_tokens;

// Re-export core types for convenience
pub use grag_core::{
    ChatProvider, ContextTable, Error, GenerationConfig, GenerationResult, Result, SearchResult,
    TextEmbedder,
};
