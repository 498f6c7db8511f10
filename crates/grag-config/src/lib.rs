//! Configuration stores for the GraphRAG companion
//!
//! Two file formats are managed here: `KEY=value` env-style files (the
//! user-facing config and the engine-facing `.env`) and the engine's
//! `settings.yaml` document. `reconcile` copies user-facing keys into the
//! engine's native format.

mod env;
mod reconcile;
mod schema;
mod yaml;

pub use env::EnvStore;
pub use reconcile::reconcile;
pub use schema::{keys, UserConfig};
pub use yaml::YamlStore;

// Re-export core types for convenience
pub use grag_core::{Error, Result};
