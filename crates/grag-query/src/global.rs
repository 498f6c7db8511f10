//! Global search: map/reduce over community report summaries

use serde::Deserialize;
use std::path::Path;

use crate::artifacts::{load_table, tables, ArtifactTable, DEFAULT_COMMUNITY_LEVEL};
use crate::tokens::approx_tokens;
use grag_core::{
    ChatProvider, ContextTable, GenerationConfig, Result, SearchResult,
};

const MAP_SYSTEM_PROMPT: &str = "You are a helpful assistant responding to questions about data in the reports provided.\n\
Generate a response consisting of a list of key points that answer the user's question, using only the data below.\n\
Respond with a JSON object of the form:\n\
{\"points\": [{\"description\": \"...\", \"score\": <0-100>}]}\n\
Score each point by how important it is for answering the question. Points not supported by the data must not appear.\n\
\n\
---Data---\n\
";

const REDUCE_SYSTEM_PROMPT: &str = "You are a helpful assistant synthesizing a final answer from ranked key points produced by multiple analysts.\n\
Remove irrelevant points, merge duplicates, and do not add information that is not supported by the points.\n\
\n\
---Analyst points---\n\
";

/// Tuning parameters for global search
#[derive(Debug, Clone)]
pub struct GlobalSearchParams {
    pub max_context_tokens: u64,
    pub map_max_tokens: u32,
    pub reduce_max_tokens: u32,
    pub temperature: f32,
    pub community_level: i64,
    pub response_type: String,
}

impl Default for GlobalSearchParams {
    fn default() -> Self {
        Self {
            max_context_tokens: 12_000,
            map_max_tokens: 1_000,
            reduce_max_tokens: 2_000,
            temperature: 0.0,
            community_level: DEFAULT_COMMUNITY_LEVEL,
            response_type: "multiple paragraphs".to_string(),
        }
    }
}

/// One community report loaded from the artifacts
#[derive(Debug, Clone)]
pub struct CommunityReport {
    pub community: String,
    pub title: String,
    pub rank: f64,
    pub content: String,
}

#[derive(Deserialize)]
struct MapResponse {
    #[serde(default)]
    points: Vec<MapPoint>,
}

#[derive(Deserialize)]
struct MapPoint {
    description: String,
    #[serde(default)]
    score: f64,
}

/// Community-level search over report summaries
pub struct GlobalSearchEngine<C: ChatProvider> {
    chat: C,
    reports: Vec<CommunityReport>,
    params: GlobalSearchParams,
}

impl<C: ChatProvider> GlobalSearchEngine<C> {
    /// Build from a run's artifacts directory
    pub fn new(chat: C, artifacts_dir: &Path, params: GlobalSearchParams) -> Result<Self> {
        let report_table = load_table(artifacts_dir, tables::COMMUNITY_REPORT)?;
        let entity_table = load_table(artifacts_dir, tables::ENTITY)?;
        let reports = filter_reports(&report_table, &entity_table, params.community_level);
        Ok(Self::from_reports(chat, reports, params))
    }

    /// Build from already-loaded reports (used by tests)
    pub fn from_reports(
        chat: C,
        reports: Vec<CommunityReport>,
        params: GlobalSearchParams,
    ) -> Self {
        Self {
            chat,
            reports,
            params,
        }
    }

    pub fn report_count(&self) -> usize {
        self.reports.len()
    }

    /// Answer a query with the map/reduce strategy
    pub async fn search(&self, query: &str) -> Result<SearchResult> {
        let batches = self.batch_reports();
        let mut llm_calls = 0u64;
        let mut prompt_tokens = 0u64;
        let mut points: Vec<MapPoint> = Vec::new();

        for batch in &batches {
            let context = render_report_context(batch);
            let config = GenerationConfig {
                model_id: self.chat.model_id().to_string(),
                max_tokens: self.params.map_max_tokens,
                temperature: self.params.temperature,
                json_mode: true,
                ..Default::default()
            };
            let result = self
                .chat
                .complete(&format!("{}{}", MAP_SYSTEM_PROMPT, context), query, &config)
                .await?;
            llm_calls += 1;
            prompt_tokens += result.prompt_tokens;

            match serde_json::from_str::<MapResponse>(&result.text) {
                Ok(parsed) => points.extend(parsed.points),
                Err(e) => {
                    eprintln!("Warning: failed to parse map response: {}", e);
                }
            }
        }

        points.retain(|p| p.score > 0.0 && !p.description.trim().is_empty());
        points.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let response = if points.is_empty() {
            let empty = SearchResult {
                response: "I am not able to answer this question given the provided data."
                    .to_string(),
                context_data: Default::default(),
                llm_calls,
                prompt_tokens,
            };
            return Ok(empty.with_table(self.reports_table()));
        } else {
            let mut ranked = String::new();
            for point in &points {
                let line = format!("(score {:.0}) {}\n", point.score, point.description);
                if approx_tokens(&ranked) + approx_tokens(&line) > self.params.max_context_tokens {
                    break;
                }
                ranked.push_str(&line);
            }
            let system = format!(
                "{}{}\n---Target response format---\n{}\n",
                REDUCE_SYSTEM_PROMPT, ranked, self.params.response_type
            );
            let config = GenerationConfig {
                model_id: self.chat.model_id().to_string(),
                max_tokens: self.params.reduce_max_tokens,
                temperature: self.params.temperature,
                json_mode: false,
                ..Default::default()
            };
            let result = self.chat.complete(&system, query, &config).await?;
            llm_calls += 1;
            prompt_tokens += result.prompt_tokens;
            result.text
        };

        let result = SearchResult {
            response,
            context_data: Default::default(),
            llm_calls,
            prompt_tokens,
        };
        Ok(result.with_table(self.reports_table()))
    }

    /// Split reports into context batches under the token budget
    fn batch_reports(&self) -> Vec<Vec<&CommunityReport>> {
        let mut batches = Vec::new();
        let mut current: Vec<&CommunityReport> = Vec::new();
        let mut used = 0u64;
        for report in &self.reports {
            let cost = approx_tokens(&report.content) + approx_tokens(&report.title);
            if !current.is_empty() && used + cost > self.params.max_context_tokens {
                batches.push(std::mem::take(&mut current));
                used = 0;
            }
            used += cost;
            current.push(report);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    fn reports_table(&self) -> ContextTable {
        let mut table = ContextTable::new("reports", vec!["community", "title", "rank"]);
        for report in &self.reports {
            table.push_row(vec![
                report.community.clone(),
                report.title.clone(),
                format!("{:.1}", report.rank),
            ]);
        }
        table
    }
}

/// Keep reports whose community appears in the entity table at or below the
/// requested level; when the entity table carries no level column, keep all
pub(crate) fn filter_reports(
    report_table: &ArtifactTable,
    entity_table: &ArtifactTable,
    community_level: i64,
) -> Vec<CommunityReport> {
    let mut allowed: Option<std::collections::BTreeSet<String>> = None;
    if entity_table
        .rows
        .first()
        .map(|r| r.contains_key("level"))
        .unwrap_or(false)
    {
        let mut communities = std::collections::BTreeSet::new();
        for row in &entity_table.rows {
            let level = row.get("level").and_then(|c| c.as_i64());
            if level.map(|l| l <= community_level).unwrap_or(false) {
                if let Some(community) = row.get("community").map(|c| c.display()) {
                    if !community.is_empty() {
                        communities.insert(community);
                    }
                }
            }
        }
        allowed = Some(communities);
    }

    let mut reports = Vec::new();
    for row in &report_table.rows {
        let community = row.get("community").map(|c| c.display()).unwrap_or_default();
        if let Some(allowed) = &allowed {
            if !allowed.contains(&community) {
                continue;
            }
        }
        reports.push(CommunityReport {
            community,
            title: row.get("title").map(|c| c.display()).unwrap_or_default(),
            rank: row.get("rank").and_then(|c| c.as_f64()).unwrap_or(0.0),
            content: row
                .get("full_content")
                .or_else(|| row.get("summary"))
                .map(|c| c.display())
                .unwrap_or_default(),
        });
    }
    reports
}

fn render_report_context(reports: &[&CommunityReport]) -> String {
    let mut context = String::new();
    for (i, report) in reports.iter().enumerate() {
        context.push_str(&format!(
            "{}. [{}] (rank {:.1})\n{}\n\n",
            i + 1,
            report.title,
            report.rank,
            report.content
        ));
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use grag_core::GenerationResult;
    use std::sync::Mutex;

    /// Chat stub that replays canned responses and records prompts
    struct ScriptedChat {
        responses: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedChat {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedChat {
        async fn complete(
            &self,
            system: &str,
            _user: &str,
            _config: &GenerationConfig,
        ) -> Result<GenerationResult> {
            self.prompts.lock().unwrap().push(system.to_string());
            let text = self.responses.lock().unwrap().pop().unwrap_or_default();
            Ok(GenerationResult {
                text,
                model_id: "test-model".to_string(),
                prompt_tokens: 10,
                completion_tokens: 5,
            })
        }

        fn model_id(&self) -> &str {
            "test-model"
        }
    }

    fn report(community: &str, title: &str, rank: f64, content: &str) -> CommunityReport {
        CommunityReport {
            community: community.to_string(),
            title: title.to_string(),
            rank,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_map_reduce_flow() {
        let chat = ScriptedChat::new(vec![
            r#"{"points": [{"description": "alpha teaches security", "score": 90}]}"#,
            "Alpha is the security course lead.",
        ]);
        let engine = GlobalSearchEngine::from_reports(
            chat,
            vec![report("0", "Community 0", 8.5, "Report about alpha.")],
            GlobalSearchParams::default(),
        );

        let result = engine.search("who teaches security?").await.unwrap();
        assert_eq!(result.response, "Alpha is the security course lead.");
        assert_eq!(result.llm_calls, 2);
        assert_eq!(result.prompt_tokens, 20);
        assert_eq!(result.context_data["reports"].len(), 1);
    }

    #[tokio::test]
    async fn test_no_supported_points_yields_refusal() {
        let chat = ScriptedChat::new(vec![r#"{"points": []}"#]);
        let engine = GlobalSearchEngine::from_reports(
            chat,
            vec![report("0", "Community 0", 1.0, "Nothing relevant.")],
            GlobalSearchParams::default(),
        );

        let result = engine.search("unrelated question").await.unwrap();
        assert!(result.response.contains("not able to answer"));
        assert_eq!(result.llm_calls, 1);
    }

    #[tokio::test]
    async fn test_unparseable_map_response_skipped() {
        let chat = ScriptedChat::new(vec!["not json at all"]);
        let engine = GlobalSearchEngine::from_reports(
            chat,
            vec![report("0", "Community 0", 1.0, "content")],
            GlobalSearchParams::default(),
        );

        let result = engine.search("q").await.unwrap();
        assert!(result.response.contains("not able to answer"));
    }

    #[test]
    fn test_batching_respects_budget() {
        let chat = ScriptedChat::new(vec![]);
        let long = "x".repeat(20_000); // ~5000 tokens
        let engine = GlobalSearchEngine::from_reports(
            chat,
            vec![
                report("0", "a", 1.0, &long),
                report("1", "b", 1.0, &long),
                report("2", "c", 1.0, &long),
            ],
            GlobalSearchParams::default(),
        );
        let batches = engine.batch_reports();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
    }

    #[test]
    fn test_filter_reports_by_level() {
        let entity_rows = vec![
            [
                ("level".to_string(), crate::CellValue::Int(0)),
                ("community".to_string(), crate::CellValue::Text("0".to_string())),
            ]
            .into_iter()
            .collect(),
            [
                ("level".to_string(), crate::CellValue::Int(3)),
                ("community".to_string(), crate::CellValue::Text("9".to_string())),
            ]
            .into_iter()
            .collect(),
        ];
        let report_rows = vec![
            [
                ("community".to_string(), crate::CellValue::Text("0".to_string())),
                ("title".to_string(), crate::CellValue::Text("kept".to_string())),
                ("rank".to_string(), crate::CellValue::Float(5.0)),
                ("full_content".to_string(), crate::CellValue::Text("c".to_string())),
            ]
            .into_iter()
            .collect(),
            [
                ("community".to_string(), crate::CellValue::Text("9".to_string())),
                ("title".to_string(), crate::CellValue::Text("dropped".to_string())),
            ]
            .into_iter()
            .collect(),
        ];
        let reports = filter_reports(
            &ArtifactTable {
                name: tables::COMMUNITY_REPORT.to_string(),
                rows: report_rows,
            },
            &ArtifactTable {
                name: tables::ENTITY.to_string(),
                rows: entity_rows,
            },
            2,
        );
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].title, "kept");
    }
}
