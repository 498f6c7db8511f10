//! Client facade: workspace lifecycle on top of the command runner
//!
//! Constructed once at process start and passed by reference to consumers.

use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{CommandOutput, CommandRunner};
use grag_config::{keys, reconcile, EnvStore};
use grag_core::{Error, IndexingRequest, PromptTuneRequest, Result, WorkspaceLayout};

/// Naming convention of the engine's timestamped run directories
const RUN_DIR_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Result of a workspace initialization attempt
#[derive(Debug, Clone, PartialEq)]
pub enum InitOutcome {
    /// The root already existed; nothing was touched
    AlreadyExists,
    /// The workspace was created and the engine's init run completed
    Initialized(CommandOutput),
}

/// Which indexing run to read artifacts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSelection {
    /// The most recent run
    Latest,
    /// The nth run in ascending timestamp order (0 is the oldest)
    Index(usize),
}

/// One timestamped output directory of a prior indexing run
#[derive(Debug, Clone, PartialEq)]
pub struct RunDir {
    pub name: String,
    pub timestamp: NaiveDateTime,
    pub path: PathBuf,
}

impl RunDir {
    /// The artifact tables of this run
    pub fn artifacts_dir(&self) -> PathBuf {
        self.path.join("artifacts")
    }
}

/// Facade over the command runner, config stores, and workspace layout
#[derive(Debug, Clone)]
pub struct RagClient {
    runner: CommandRunner,
    layout: WorkspaceLayout,
    user_env_path: PathBuf,
}

impl RagClient {
    pub fn new(
        runner: CommandRunner,
        layout: WorkspaceLayout,
        user_env_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            layout,
            user_env_path: user_env_path.into(),
        }
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Bootstrap a new workspace: create the root and `input/` directories,
    /// then run the engine in init mode.
    ///
    /// An existing root is left untouched; prior state is never clobbered.
    pub fn initialize_indexing(&self) -> Result<InitOutcome> {
        let root = self.layout.root();
        if root.exists() {
            return Ok(InitOutcome::AlreadyExists);
        }
        fs::create_dir_all(self.layout.input_dir())?;

        let request = IndexingRequest::builder(root).init(true).build()?;
        let output = self.runner.run_indexing(&request)?;
        Ok(InitOutcome::Initialized(output))
    }

    /// Run an indexing pass over an existing workspace
    pub fn run_indexing(&self, request: &IndexingRequest) -> Result<CommandOutput> {
        self.runner.run_indexing(request)
    }

    /// Run prompt tuning and relay the captured output
    pub fn initialize_prompt_tune(&self, request: &PromptTuneRequest) -> Result<CommandOutput> {
        self.runner.run_prompt_tune(request)
    }

    /// Reconcile the user config into the engine env file and settings YAML
    pub fn initialize_config(&self) -> Result<()> {
        reconcile(
            &self.user_env_path,
            &self.layout.env_path(),
            &self.layout.settings_path(),
        )
    }

    /// All prior indexing runs, oldest first
    pub fn list_runs(&self) -> Result<Vec<RunDir>> {
        let output_dir = self.layout.output_dir();
        let mut runs = Vec::new();
        if output_dir.is_dir() {
            for entry in fs::read_dir(&output_dir)? {
                let entry = entry?;
                if !entry.path().is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if let Ok(timestamp) = NaiveDateTime::parse_from_str(&name, RUN_DIR_FORMAT) {
                    runs.push(RunDir {
                        name,
                        timestamp,
                        path: entry.path(),
                    });
                }
            }
        }
        runs.sort_by_key(|run| run.timestamp);
        Ok(runs)
    }

    /// Select one run's artifacts directory as the source for query engines
    pub fn get_config_for_query(&self, selection: RunSelection) -> Result<PathBuf> {
        let runs = self.list_runs()?;
        if runs.is_empty() {
            return Err(Error::Workspace(format!(
                "no indexing runs found under {}; run indexing first",
                self.layout.output_dir().display()
            )));
        }
        let run = match selection {
            RunSelection::Latest => &runs[runs.len() - 1],
            RunSelection::Index(i) => runs.get(i).ok_or_else(|| {
                Error::Workspace(format!(
                    "run index {} out of range; {} runs available",
                    i,
                    runs.len()
                ))
            })?,
        };
        Ok(run.artifacts_dir())
    }

    /// API key for query engines, read from the user-facing env file
    pub fn api_key_for_query(&self) -> Result<Option<String>> {
        let store = EnvStore::open(&self.user_env_path)?;
        store.get(keys::API_KEY)
    }

    pub fn user_env_path(&self) -> &Path {
        &self.user_env_path
    }
}
