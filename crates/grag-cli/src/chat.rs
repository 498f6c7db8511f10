//! Interactive chat loop over the query engines

use colored::*;

use crate::ui;
use grag_core::{Result, SearchResult};
use grag_query::{ChatClient, EmbeddingClient, GlobalSearchEngine, LocalSearchEngine};

/// The search strategy answering queries in this session
pub enum QueryEngine {
    Global(GlobalSearchEngine<ChatClient>),
    Local(LocalSearchEngine<ChatClient, EmbeddingClient>),
}

impl QueryEngine {
    pub fn name(&self) -> &'static str {
        match self {
            QueryEngine::Global(_) => "global",
            QueryEngine::Local(_) => "local",
        }
    }

    pub async fn search(&self, query: &str) -> Result<SearchResult> {
        match self {
            QueryEngine::Global(engine) => engine.search(query).await,
            QueryEngine::Local(engine) => engine.search(query).await,
        }
    }
}

/// Print an answer with its usage counters and, optionally, the context
/// tables it was grounded on
pub fn print_search_result(result: &SearchResult, show_tables: bool) {
    println!();
    println!("{}", result.response);
    println!();
    println!(
        "{}",
        format!(
            "{} LLM call(s), ~{} prompt tokens",
            result.llm_calls, result.prompt_tokens
        )
        .dimmed()
    );
    if show_tables {
        println!();
        for table in result.context_data.values() {
            ui::print_table(table);
        }
    }
}

/// Run the interactive loop until exit/quit or EOF
///
/// `engine` answers queries; `/engine` swaps it with `alternate`.
pub async fn run_chat(mut engine: QueryEngine, mut alternate: QueryEngine) -> Result<()> {
    ui::display_banner();
    println!(
        "{}",
        format!("Engine: {} search", engine.name()).dimmed()
    );
    println!();

    let mut history: Vec<String> = Vec::new();
    let mut show_tables = false;

    loop {
        let input = ui::handle_input_with_history(&mut history).await?;
        let input = input.trim();

        if let Some(arg) = input.strip_prefix("/engine") {
            let arg = arg.trim();
            if arg.is_empty() || arg == alternate.name() {
                std::mem::swap(&mut engine, &mut alternate);
            } else if arg != engine.name() {
                eprintln!("{} unknown engine: {}", "Error:".red().bold(), arg);
                continue;
            }
            println!(
                "{}",
                format!("Engine: {} search", engine.name()).dimmed()
            );
            continue;
        }

        match input {
            "" => continue,
            "exit" | "quit" => {
                println!("{}", "Goodbye!".green());
                return Ok(());
            }
            "help" => {
                ui::print_help();
                continue;
            }
            "tables" => {
                show_tables = !show_tables;
                println!(
                    "{}",
                    format!(
                        "Context tables {}",
                        if show_tables { "shown" } else { "hidden" }
                    )
                    .dimmed()
                );
                continue;
            }
            _ => {}
        }

        match engine.search(input).await {
            Ok(result) => print_search_result(&result, show_tables),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }
}
