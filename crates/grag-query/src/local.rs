//! Local search: entity-level mixed context
//!
//! Ranks entities against the query, then gathers their relationships,
//! claims, community reports, and source text units into one budgeted
//! context for a single completion call.

use std::collections::BTreeSet;
use std::path::Path;

use crate::artifacts::{load_optional_table, load_table, tables, ArtifactRow, ArtifactTable};
use crate::global::{filter_reports, CommunityReport};
use crate::tokens::approx_tokens;
use grag_core::{
    ChatProvider, ContextTable, GenerationConfig, Result, SearchResult, TextEmbedder,
};

const LOCAL_SYSTEM_PROMPT: &str = "You are a helpful assistant responding to questions about data in the tables provided.\n\
Use only the data below; if the answer is not in the data, say so.\n";

/// Tuning parameters for local search
#[derive(Debug, Clone)]
pub struct LocalSearchParams {
    pub max_context_tokens: u64,
    /// Share of the context budget spent on source text units
    pub text_unit_prop: f64,
    /// Share of the context budget spent on community reports
    pub community_prop: f64,
    pub top_k_entities: usize,
    pub top_k_relationships: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub community_level: i64,
    pub response_type: String,
}

impl Default for LocalSearchParams {
    fn default() -> Self {
        Self {
            max_context_tokens: 12_000,
            text_unit_prop: 0.5,
            community_prop: 0.1,
            top_k_entities: 10,
            top_k_relationships: 10,
            max_tokens: 2_000,
            temperature: 0.0,
            community_level: crate::artifacts::DEFAULT_COMMUNITY_LEVEL,
            response_type: "multiple paragraphs".to_string(),
        }
    }
}

/// An entity loaded from the artifacts
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub description: String,
    pub degree: f64,
    pub embedding: Option<Vec<f32>>,
    pub text_unit_ids: Vec<String>,
}

/// A relationship between two entities
#[derive(Debug, Clone)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub description: String,
    pub weight: f64,
}

/// A claim extracted about an entity
#[derive(Debug, Clone)]
pub struct Claim {
    pub subject: String,
    pub claim_type: String,
    pub description: String,
}

/// A chunk of source text
#[derive(Debug, Clone)]
pub struct TextUnit {
    pub id: String,
    pub text: String,
}

/// Entity-level search over the artifact tables
pub struct LocalSearchEngine<C: ChatProvider, E: TextEmbedder> {
    chat: C,
    embedder: Option<E>,
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
    claims: Option<Vec<Claim>>,
    reports: Vec<CommunityReport>,
    text_units: Vec<TextUnit>,
    params: LocalSearchParams,
}

impl<C: ChatProvider, E: TextEmbedder> LocalSearchEngine<C, E> {
    /// Build from a run's artifacts directory
    pub fn new(
        chat: C,
        embedder: Option<E>,
        artifacts_dir: &Path,
        params: LocalSearchParams,
    ) -> Result<Self> {
        let entity_table = load_table(artifacts_dir, tables::ENTITY_EMBEDDING)?;
        let node_table = load_table(artifacts_dir, tables::ENTITY)?;
        let relationship_table = load_table(artifacts_dir, tables::RELATIONSHIP)?;
        let covariate_table = load_optional_table(artifacts_dir, tables::COVARIATE)?;
        let report_table = load_table(artifacts_dir, tables::COMMUNITY_REPORT)?;
        let text_unit_table = load_table(artifacts_dir, tables::TEXT_UNIT)?;

        let entities = read_entities(&entity_table, &node_table);
        let relationships = read_relationships(&relationship_table);
        let claims = covariate_table.as_ref().map(read_claims);
        let reports = filter_reports(&report_table, &node_table, params.community_level);
        let text_units = read_text_units(&text_unit_table);

        Ok(Self::from_parts(
            chat,
            embedder,
            entities,
            relationships,
            claims,
            reports,
            text_units,
            params,
        ))
    }

    /// Build from already-loaded tables (used by tests)
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        chat: C,
        embedder: Option<E>,
        entities: Vec<Entity>,
        relationships: Vec<Relationship>,
        claims: Option<Vec<Claim>>,
        reports: Vec<CommunityReport>,
        text_units: Vec<TextUnit>,
        params: LocalSearchParams,
    ) -> Self {
        Self {
            chat,
            embedder,
            entities,
            relationships,
            claims,
            reports,
            text_units,
            params,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Answer a query from entity-level context
    pub async fn search(&self, query: &str) -> Result<SearchResult> {
        let selected = self.select_entities(query).await?;
        let names: BTreeSet<&str> = selected.iter().map(|e| e.name.as_str()).collect();

        let mut relationships: Vec<&Relationship> = self
            .relationships
            .iter()
            .filter(|r| names.contains(r.source.as_str()) || names.contains(r.target.as_str()))
            .collect();
        relationships.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        relationships.truncate(self.params.top_k_relationships);

        let claims: Vec<&Claim> = self
            .claims
            .iter()
            .flatten()
            .filter(|c| names.contains(c.subject.as_str()))
            .collect();

        let text_budget =
            (self.params.max_context_tokens as f64 * self.params.text_unit_prop) as u64;
        let sources = self.select_text_units(&selected, text_budget);

        let community_budget =
            (self.params.max_context_tokens as f64 * self.params.community_prop) as u64;
        let reports = select_reports(&self.reports, community_budget);

        let context = render_context(&selected, &relationships, &claims, &reports, &sources);
        let system = format!(
            "{}\n{}\n---Target response format---\n{}\n",
            LOCAL_SYSTEM_PROMPT, context, self.params.response_type
        );

        let config = GenerationConfig {
            model_id: self.chat.model_id().to_string(),
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            json_mode: false,
            ..Default::default()
        };
        let generation = self.chat.complete(&system, query, &config).await?;

        let mut result = SearchResult {
            response: generation.text,
            context_data: Default::default(),
            llm_calls: 1,
            prompt_tokens: generation.prompt_tokens,
        };

        let mut entity_table = ContextTable::new("entities", vec!["id", "name", "degree", "description"]);
        for entity in &selected {
            entity_table.push_row(vec![
                entity.id.clone(),
                entity.name.clone(),
                format!("{:.0}", entity.degree),
                truncate(&entity.description, 200),
            ]);
        }
        result.context_data.insert("entities".to_string(), entity_table);

        let mut rel_table =
            ContextTable::new("relationships", vec!["source", "target", "weight", "description"]);
        for rel in &relationships {
            rel_table.push_row(vec![
                rel.source.clone(),
                rel.target.clone(),
                format!("{:.1}", rel.weight),
                truncate(&rel.description, 200),
            ]);
        }
        result.context_data.insert("relationships".to_string(), rel_table);

        let mut source_table = ContextTable::new("sources", vec!["id", "text"]);
        for unit in &sources {
            source_table.push_row(vec![unit.id.clone(), truncate(&unit.text, 200)]);
        }
        result.context_data.insert("sources".to_string(), source_table);

        let mut report_table = ContextTable::new("reports", vec!["community", "title", "rank"]);
        for report in &reports {
            report_table.push_row(vec![
                report.community.clone(),
                report.title.clone(),
                format!("{:.1}", report.rank),
            ]);
        }
        result.context_data.insert("reports".to_string(), report_table);

        if self.claims.is_some() {
            let mut claim_table =
                ContextTable::new("claims", vec!["subject", "type", "description"]);
            for claim in &claims {
                claim_table.push_row(vec![
                    claim.subject.clone(),
                    claim.claim_type.clone(),
                    truncate(&claim.description, 200),
                ]);
            }
            result.context_data.insert("claims".to_string(), claim_table);
        }

        Ok(result)
    }

    /// Rank entities against the query and take the top k
    async fn select_entities(&self, query: &str) -> Result<Vec<&Entity>> {
        let query_embedding = match &self.embedder {
            Some(embedder) if self.entities.iter().any(|e| e.embedding.is_some()) => {
                Some(embedder.embed(query).await?)
            }
            _ => None,
        };

        let mut scored: Vec<(f64, &Entity)> = self
            .entities
            .iter()
            .map(|entity| {
                let score = match (&query_embedding, &entity.embedding) {
                    (Some(query_emb), Some(entity_emb)) => {
                        cosine_similarity(query_emb, entity_emb) as f64
                    }
                    _ => lexical_score(query, entity),
                };
                (score, entity)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .filter(|(score, _)| *score > 0.0)
            .take(self.params.top_k_entities)
            .map(|(_, entity)| entity)
            .collect())
    }

    /// Source text units of the selected entities, under the token budget
    fn select_text_units(&self, selected: &[&Entity], budget: u64) -> Vec<&TextUnit> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        let mut used = 0u64;
        for entity in selected {
            for id in &entity.text_unit_ids {
                if !seen.insert(id.as_str()) {
                    continue;
                }
                if let Some(unit) = self.text_units.iter().find(|u| &u.id == id) {
                    let cost = approx_tokens(&unit.text);
                    if used + cost > budget {
                        return out;
                    }
                    used += cost;
                    out.push(unit);
                }
            }
        }
        out
    }
}

/// Highest-ranked community reports that fit the budget
fn select_reports(reports: &[CommunityReport], budget: u64) -> Vec<&CommunityReport> {
    let mut sorted: Vec<&CommunityReport> = reports.iter().collect();
    sorted.sort_by(|a, b| b.rank.partial_cmp(&a.rank).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = Vec::new();
    let mut used = 0u64;
    for report in sorted {
        let cost = approx_tokens(&report.content);
        if used + cost > budget {
            break;
        }
        used += cost;
        out.push(report);
    }
    out
}

/// Word-overlap fallback ranking when no embeddings are available
fn lexical_score(query: &str, entity: &Entity) -> f64 {
    let query_words: BTreeSet<String> = words(query);
    if query_words.is_empty() {
        return 0.0;
    }
    let entity_words: BTreeSet<String> =
        words(&format!("{} {}", entity.name, entity.description));
    let overlap = query_words.intersection(&entity_words).count();
    overlap as f64 / query_words.len() as f64
}

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    dot_product / (magnitude_a * magnitude_b)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}…", head)
    }
}

fn render_context(
    entities: &[&Entity],
    relationships: &[&Relationship],
    claims: &[&Claim],
    reports: &[&CommunityReport],
    sources: &[&TextUnit],
) -> String {
    let mut context = String::new();

    context.push_str("-----Entities-----\nid|name|degree|description\n");
    for entity in entities {
        context.push_str(&format!(
            "{}|{}|{:.0}|{}\n",
            entity.id, entity.name, entity.degree, entity.description
        ));
    }

    context.push_str("\n-----Relationships-----\nsource|target|weight|description\n");
    for rel in relationships {
        context.push_str(&format!(
            "{}|{}|{:.1}|{}\n",
            rel.source, rel.target, rel.weight, rel.description
        ));
    }

    if !claims.is_empty() {
        context.push_str("\n-----Claims-----\nsubject|type|description\n");
        for claim in claims {
            context.push_str(&format!(
                "{}|{}|{}\n",
                claim.subject, claim.claim_type, claim.description
            ));
        }
    }

    if !reports.is_empty() {
        context.push_str("\n-----Reports-----\ntitle|content\n");
        for report in reports {
            context.push_str(&format!("{}|{}\n", report.title, report.content));
        }
    }

    if !sources.is_empty() {
        context.push_str("\n-----Sources-----\nid|text\n");
        for unit in sources {
            context.push_str(&format!("{}|{}\n", unit.id, unit.text));
        }
    }

    context
}

fn read_entities(entity_table: &ArtifactTable, node_table: &ArtifactTable) -> Vec<Entity> {
    let degree_of = |name: &str| -> f64 {
        node_table
            .rows
            .iter()
            .find(|row| row.get("title").and_then(|c| c.as_str()) == Some(name))
            .and_then(|row| row.get("degree"))
            .and_then(|c| c.as_f64())
            .unwrap_or(0.0)
    };

    entity_table
        .rows
        .iter()
        .map(|row| {
            let name = text_column(row, "name");
            let degree = degree_of(&name);
            Entity {
                id: text_column(row, "id"),
                name,
                description: text_column(row, "description"),
                degree,
                embedding: row
                    .get("description_embedding")
                    .and_then(|c| c.as_float_list())
                    .map(|v| v.to_vec()),
                text_unit_ids: row
                    .get("text_unit_ids")
                    .and_then(|c| c.as_text_list())
                    .map(|v| v.to_vec())
                    .unwrap_or_default(),
            }
        })
        .collect()
}

fn read_relationships(table: &ArtifactTable) -> Vec<Relationship> {
    table
        .rows
        .iter()
        .map(|row| Relationship {
            source: text_column(row, "source"),
            target: text_column(row, "target"),
            description: text_column(row, "description"),
            weight: row.get("weight").and_then(|c| c.as_f64()).unwrap_or(0.0),
        })
        .collect()
}

fn read_claims(table: &ArtifactTable) -> Vec<Claim> {
    table
        .rows
        .iter()
        .map(|row| Claim {
            subject: text_column(row, "subject_id"),
            claim_type: text_column(row, "type"),
            description: text_column(row, "description"),
        })
        .collect()
}

fn read_text_units(table: &ArtifactTable) -> Vec<TextUnit> {
    table
        .rows
        .iter()
        .map(|row| TextUnit {
            id: text_column(row, "id"),
            text: text_column(row, "text"),
        })
        .collect()
}

fn text_column(row: &ArtifactRow, name: &str) -> String {
    row.get(name).map(|c| c.display()).unwrap_or_default()
}
