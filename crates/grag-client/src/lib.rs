//! Lifecycle client for the external GraphRAG engine
//!
//! `CommandRunner` assembles argument lists from request records and runs
//! the engine as a subprocess; `RagClient` composes the runner with the
//! config stores into workspace lifecycle operations.

mod client;
mod runner;

pub use client::{InitOutcome, RagClient, RunDir, RunSelection};
pub use runner::{CommandOutput, CommandRunner};

// Re-export core types for convenience
pub use grag_core::{Error, Result};
