//! UI utilities for the CLI

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use grag_client::CommandOutput;
use grag_core::{ContextTable, Result};
use std::io::{self, IsTerminal, Write};

const PROMPT: &str = "grag>";

/// One framed banner line: `│  content …│`, padded to the banner width.
/// Widths are counted in chars and saturate, so narrow terminals get a
/// ragged frame instead of a panic.
fn framed_line(content: &str, banner_width: usize) -> String {
    let pad = banner_width.saturating_sub(content.chars().count() + 4);
    format!("│  {}{}│", content, " ".repeat(pad))
}

/// Display startup banner
pub fn display_banner() {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(67, terminal_width.saturating_sub(4)).max(4);

    let top_border = format!("┌{}┐", "─".repeat(banner_width.saturating_sub(2)));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width.saturating_sub(2)));
    let empty_line = framed_line("", banner_width);

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let title = "GRAG - GraphRAG Companion";
    let title_pad = banner_width.saturating_sub(title.chars().count() + 4);
    println!("│  {}{}│", title.blue().bold(), " ".repeat(title_pad));

    println!("{}", empty_line.blue());

    let feature_lines = [
        "Query your indexed knowledge graph",
        "",
        "Features:",
        "• Global search over community reports",
        "• Local search over entities and sources",
        "• Command history navigation (↑/↓ arrows)",
    ];
    for line in feature_lines {
        println!("{}", framed_line(line, banner_width).blue());
    }

    println!("{}", empty_line.blue());
    let version = "v0.1.0";
    let version_pad = banner_width.saturating_sub(version.chars().count() + 4);
    println!("│  {}{}│", version.dimmed(), " ".repeat(version_pad));
    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "Tip: Type a question about your data, or 'help' for commands".dimmed()
    );
    println!();
}

/// Editor state for the raw-mode prompt. The cursor is a char index, so
/// edits stay on char boundaries regardless of input script.
struct LineBuffer {
    chars: Vec<char>,
    cursor: usize,
    last_width: usize,
}

impl LineBuffer {
    fn new() -> Self {
        Self {
            chars: Vec::new(),
            cursor: 0,
            last_width: 0,
        }
    }

    fn insert(&mut self, c: char) {
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.chars.remove(self.cursor - 1);
        self.cursor -= 1;
        true
    }

    fn set(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.cursor = self.chars.len();
    }

    fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }

    fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Redraw the prompt line, blanking whatever the previous draw left
    /// behind when the line got shorter
    fn redraw(&mut self, out: &mut impl Write) -> io::Result<()> {
        let text = self.text();
        let pad = self.last_width.saturating_sub(self.chars.len());
        write!(out, "\r{} {}{}", PROMPT.green().bold(), text, " ".repeat(pad))?;
        if pad > 0 {
            write!(out, "\r{} {}", PROMPT.green().bold(), text)?;
        }
        self.last_width = self.chars.len();
        out.flush()
    }
}

/// Restores cooked mode when dropped, so an input error cannot leave the
/// terminal stuck in raw mode
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Handle input with command history navigation
pub async fn handle_input_with_history(history: &mut Vec<String>) -> Result<String> {
    // Check if stdin is a terminal (interactive) or piped
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF on piped input ends the session
            return Ok("exit".to_string());
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(input);
    }

    let guard = RawModeGuard::enable()?;
    let mut line = LineBuffer::new();
    let mut history_index: Option<usize> = None;
    let mut stdout = io::stdout();

    print!("{} ", PROMPT.green().bold());
    stdout.flush()?;

    loop {
        if let Event::Key(key_event) = event::read()? {
            match key_event.code {
                KeyCode::Enter => {
                    drop(guard);
                    println!();
                    let input = line.text();
                    if !input.is_empty() {
                        history.push(input.clone());
                    }
                    return Ok(input);
                }
                KeyCode::Char(c) => {
                    line.insert(c);
                    line.redraw(&mut stdout)?;
                }
                KeyCode::Backspace => {
                    if line.backspace() {
                        line.redraw(&mut stdout)?;
                    }
                }
                KeyCode::Up => {
                    if !history.is_empty() {
                        let new_index = match history_index {
                            None => history.len() - 1,
                            Some(idx) if idx > 0 => idx - 1,
                            Some(idx) => idx,
                        };
                        history_index = Some(new_index);
                        line.set(&history[new_index]);
                        line.redraw(&mut stdout)?;
                    }
                }
                KeyCode::Down => {
                    if let Some(idx) = history_index {
                        if idx < history.len() - 1 {
                            let new_index = idx + 1;
                            history_index = Some(new_index);
                            line.set(&history[new_index]);
                        } else {
                            history_index = None;
                            line.clear();
                        }
                        line.redraw(&mut stdout)?;
                    }
                }
                KeyCode::Esc => {
                    drop(guard);
                    println!();
                    return Ok(String::new());
                }
                _ => {}
            }
        }
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!(
        "  {} - Ask a question about your indexed data",
        "<question>".green()
    );
    println!(
        "  {} - Toggle display of context tables after each answer",
        "tables".green()
    );
    println!(
        "  {} - Switch between global and local search",
        "/engine [global|local]".green()
    );
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  what are the main themes in the corpus?");
    println!("  who is connected to Scrooge?");
}

/// Render one context table as aligned text
pub fn format_table(table: &ContextTable) -> String {
    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.len()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let render_row = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(cell.len());
                format!("{:<width$}", cell, width = width)
            })
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    let rule_len = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
    let header: Vec<String> = table.columns.iter().map(|c| c.to_string()).collect();
    let mut out = render_row(&header);
    out.push('\n');
    out.push_str(&"-".repeat(rule_len));
    out.push('\n');
    for row in &table.rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

/// Print a context table with its name as heading, first rows only
pub fn print_table(table: &ContextTable) {
    const MAX_ROWS: usize = 10;
    println!("{}", table.name.bold());
    if table.len() > MAX_ROWS {
        let mut preview = table.clone();
        preview.rows.truncate(MAX_ROWS);
        print!("{}", format_table(&preview));
        println!("{}", format!("… {} more rows", table.len() - MAX_ROWS).dimmed());
        println!();
    } else {
        println!("{}", format_table(table));
    }
}

/// Relay a captured engine invocation to the terminal
pub fn print_command_output(output: &CommandOutput) {
    if !output.stdout.is_empty() {
        println!("{}", output.stdout);
    }
    if output.stderr != "none" {
        eprintln!("{}", output.stderr.red());
    }
    if output.success() {
        println!("{}", "✓ Engine run completed".green());
    } else {
        println!(
            "{}",
            format!("✗ Engine run failed (status {:?})", output.status).red()
        );
    }
}
