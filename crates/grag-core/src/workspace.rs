//! Workspace layout of a single indexing project
//!
//! On disk a workspace looks like:
//!
//! ```text
//! <root>/input/                       source documents
//! <root>/output/<timestamp>/artifacts engine output tables
//! <root>/settings.yaml                engine settings document
//! <root>/.env                         engine-facing environment file
//! <root>/prompts/                     tuned prompt templates
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Resolves the conventional paths inside a workspace root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where source documents are dropped before indexing
    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input")
    }

    /// Parent of the timestamped run directories
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    /// The engine settings document
    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.yaml")
    }

    /// The engine-facing env file (holds the API key)
    pub fn env_path(&self) -> PathBuf {
        self.root.join(".env")
    }

    /// Where prompt tuning writes its templates
    pub fn prompts_dir(&self) -> PathBuf {
        self.root.join("prompts")
    }

    /// The artifacts directory of a named run
    pub fn artifacts_dir(&self, run_name: &str) -> PathBuf {
        self.output_dir().join(run_name).join("artifacts")
    }
}
