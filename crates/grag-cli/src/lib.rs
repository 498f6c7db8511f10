//! Terminal interface for the GraphRAG companion

mod chat;
mod ui;

pub use chat::{print_search_result, run_chat, QueryEngine};
pub use ui::{display_banner, handle_input_with_history, print_command_output, print_help, print_table};

// Re-export core types
pub use grag_core::{Error, Result};
