//! Request records for the external indexing engine
//!
//! These are immutable, validated at construction, and consumed once per
//! invocation by the command runner.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Output formats the engine can emit for its artifact tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmitFormat {
    Json,
    Csv,
    Parquet,
}

impl EmitFormat {
    /// The value passed to the engine's `--emit` flag
    pub fn as_flag(&self) -> &'static str {
        match self {
            EmitFormat::Json => "json",
            EmitFormat::Csv => "csv",
            EmitFormat::Parquet => "parquet",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<EmitFormat> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(EmitFormat::Json),
            "csv" => Some(EmitFormat::Csv),
            "parquet" => Some(EmitFormat::Parquet),
            _ => None,
        }
    }
}

/// Progress reporter styles understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reporter {
    Rich,
    Print,
    None,
}

impl Reporter {
    /// The value passed to the engine's `--reporter` flag
    pub fn as_flag(&self) -> &'static str {
        match self {
            Reporter::Rich => "rich",
            Reporter::Print => "print",
            Reporter::None => "none",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Reporter> {
        match s.trim().to_lowercase().as_str() {
            "rich" => Some(Reporter::Rich),
            "print" => Some(Reporter::Print),
            "none" => Some(Reporter::None),
            _ => None,
        }
    }
}

/// A single indexing invocation of the external engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingRequest {
    pub root: PathBuf,
    pub init: bool,
    pub verbose: bool,
    pub resume: Option<String>,
    pub reporter: Option<Reporter>,
    pub emit: Vec<EmitFormat>,
    pub config: Option<PathBuf>,
    pub dry_run: bool,
    pub no_cache: bool,
    pub skip_validations: bool,
    pub mem_profile: bool,
}

impl IndexingRequest {
    /// Start building a request rooted at the given workspace directory
    pub fn builder(root: impl Into<PathBuf>) -> IndexingRequestBuilder {
        IndexingRequestBuilder {
            root: root.into(),
            init: false,
            verbose: false,
            resume: None,
            reporter: None,
            emit: Vec::new(),
            config: None,
            dry_run: false,
            no_cache: false,
            skip_validations: false,
            mem_profile: false,
        }
    }
}

/// Builder for [`IndexingRequest`]; `build` validates the result
#[derive(Debug, Clone)]
pub struct IndexingRequestBuilder {
    root: PathBuf,
    init: bool,
    verbose: bool,
    resume: Option<String>,
    reporter: Option<Reporter>,
    emit: Vec<EmitFormat>,
    config: Option<PathBuf>,
    dry_run: bool,
    no_cache: bool,
    skip_validations: bool,
    mem_profile: bool,
}

impl IndexingRequestBuilder {
    pub fn init(mut self, init: bool) -> Self {
        self.init = init;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn resume(mut self, token: impl Into<String>) -> Self {
        self.resume = Some(token.into());
        self
    }

    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn emit(mut self, formats: Vec<EmitFormat>) -> Self {
        self.emit = formats;
        self
    }

    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn skip_validations(mut self, skip: bool) -> Self {
        self.skip_validations = skip;
        self
    }

    pub fn mem_profile(mut self, mem_profile: bool) -> Self {
        self.mem_profile = mem_profile;
        self
    }

    pub fn build(self) -> Result<IndexingRequest> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "indexing request requires a non-empty root path".to_string(),
            ));
        }
        if let Some(token) = &self.resume {
            if token.trim().is_empty() {
                return Err(Error::Configuration(
                    "resume token must not be blank".to_string(),
                ));
            }
        }
        Ok(IndexingRequest {
            root: self.root,
            init: self.init,
            verbose: self.verbose,
            resume: self.resume,
            reporter: self.reporter,
            emit: self.emit,
            config: self.config,
            dry_run: self.dry_run,
            no_cache: self.no_cache,
            skip_validations: self.skip_validations,
            mem_profile: self.mem_profile,
        })
    }
}

/// A single prompt-tuning invocation of the external engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTuneRequest {
    pub root: PathBuf,
    pub config: PathBuf,
    pub output: PathBuf,
    pub domain: Option<String>,
    pub limit: u32,
    pub language: Option<String>,
    pub max_tokens: u32,
    pub chunk_size: u32,
    pub no_entity_types: bool,
}

impl PromptTuneRequest {
    /// Start building a request; config and output default to the engine's
    /// conventional locations under the root
    pub fn builder(root: impl Into<PathBuf>) -> PromptTuneRequestBuilder {
        let root = root.into();
        let config = root.join("settings.yaml");
        let output = root.join("prompts");
        PromptTuneRequestBuilder {
            root,
            config,
            output,
            domain: None,
            limit: 15,
            language: None,
            max_tokens: 2048,
            chunk_size: 256,
            no_entity_types: false,
        }
    }
}

/// Builder for [`PromptTuneRequest`]; `build` validates the result
#[derive(Debug, Clone)]
pub struct PromptTuneRequestBuilder {
    root: PathBuf,
    config: PathBuf,
    output: PathBuf,
    domain: Option<String>,
    limit: u32,
    language: Option<String>,
    max_tokens: u32,
    chunk_size: u32,
    no_entity_types: bool,
}

impl PromptTuneRequestBuilder {
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = path.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn no_entity_types(mut self, no_entity_types: bool) -> Self {
        self.no_entity_types = no_entity_types;
        self
    }

    pub fn build(self) -> Result<PromptTuneRequest> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "prompt-tune request requires a non-empty root path".to_string(),
            ));
        }
        if self.limit == 0 {
            return Err(Error::Configuration(
                "sampling limit must be greater than zero".to_string(),
            ));
        }
        if self.max_tokens == 0 || self.chunk_size == 0 {
            return Err(Error::Configuration(
                "max_tokens and chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(PromptTuneRequest {
            root: self.root,
            config: self.config,
            output: self.output,
            domain: self.domain,
            limit: self.limit,
            language: self.language,
            max_tokens: self.max_tokens,
            chunk_size: self.chunk_size,
            no_entity_types: self.no_entity_types,
        })
    }
}

/// Render a path as a command-line argument
pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_defaults() {
        let req = IndexingRequest::builder("./ragtest").build().unwrap();
        assert_eq!(req.root, PathBuf::from("./ragtest"));
        assert!(!req.init);
        assert!(req.resume.is_none());
        assert!(req.emit.is_empty());
    }

    #[test]
    fn test_indexing_rejects_empty_root() {
        assert!(IndexingRequest::builder("").build().is_err());
    }

    #[test]
    fn test_indexing_rejects_blank_resume() {
        let result = IndexingRequest::builder("./ragtest").resume("  ").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_prompt_tune_defaults() {
        let req = PromptTuneRequest::builder("./ragtest").build().unwrap();
        assert_eq!(req.config, PathBuf::from("./ragtest/settings.yaml"));
        assert_eq!(req.output, PathBuf::from("./ragtest/prompts"));
        assert_eq!(req.limit, 15);
        assert_eq!(req.max_tokens, 2048);
        assert_eq!(req.chunk_size, 256);
    }

    #[test]
    fn test_prompt_tune_rejects_zero_limit() {
        assert!(PromptTuneRequest::builder("./ragtest").limit(0).build().is_err());
    }

    #[test]
    fn test_emit_format_parse() {
        assert_eq!(EmitFormat::parse("JSON"), Some(EmitFormat::Json));
        assert_eq!(EmitFormat::parse("parquet"), Some(EmitFormat::Parquet));
        assert_eq!(EmitFormat::parse("yaml"), None);
    }

    #[test]
    fn test_reporter_parse() {
        assert_eq!(Reporter::parse("rich"), Some(Reporter::Rich));
        assert_eq!(Reporter::parse("NONE"), Some(Reporter::None));
        assert_eq!(Reporter::parse("fancy"), None);
    }
}
