//! Structured search results returned by the query adapters

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A small named table of context rows included in a search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ContextTable {
    pub fn new(name: impl Into<String>, columns: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Response text plus the context tables and usage counters for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub response: String,
    /// Named tables: reports, entities, relationships, sources, claims
    pub context_data: BTreeMap<String, ContextTable>,
    pub llm_calls: u64,
    pub prompt_tokens: u64,
}

impl SearchResult {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            context_data: BTreeMap::new(),
            llm_calls: 0,
            prompt_tokens: 0,
        }
    }

    pub fn with_table(mut self, table: ContextTable) -> Self {
        self.context_data.insert(table.name.clone(), table);
        self
    }
}
