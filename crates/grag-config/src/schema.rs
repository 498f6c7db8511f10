//! Typed user-facing configuration
//!
//! The user config lives in an env-style file but has a fixed schema; each
//! field carries an explicit serialization rule, so booleans can never be
//! written where the engine expects a string.

use std::collections::BTreeMap;

use crate::EnvStore;
use grag_core::Result;

/// Key names in the user-facing env file
pub mod keys {
    pub const API_KEY: &str = "GRAPHRAG_API_KEY";
    pub const API_BASE: &str = "API_BASE";
    pub const MODEL_ID: &str = "MODEL_ID";
    pub const EMBEDDING_MODEL_ID: &str = "EMBEDDING_MODEL_ID";
    pub const CLAIM_EXTRACTION: &str = "CLAIM_EXTRACTION";
}

/// The user-facing configuration, read at every engine bootstrap
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model_id: Option<String>,
    pub embedding_model_id: Option<String>,
    pub claim_extraction: bool,
}

impl UserConfig {
    /// Load from an env-style store
    pub fn from_store(store: &EnvStore) -> Result<Self> {
        Ok(Self::from_map(&store.read_all()?))
    }

    /// Build from a raw key-value map; the claim flag is the engine's
    /// string comparison against `"True"`
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        Self {
            api_key: map.get(keys::API_KEY).cloned(),
            api_base: map.get(keys::API_BASE).cloned(),
            model_id: map.get(keys::MODEL_ID).cloned(),
            embedding_model_id: map.get(keys::EMBEDDING_MODEL_ID).cloned(),
            claim_extraction: map.get(keys::CLAIM_EXTRACTION).map(String::as_str) == Some("True"),
        }
    }

    /// Serialize to the env-file representation; the claim flag is
    /// rendered `"True"`/`"False"`, the form the engine's settings expect
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(v) = &self.api_key {
            map.insert(keys::API_KEY.to_string(), v.clone());
        }
        if let Some(v) = &self.api_base {
            map.insert(keys::API_BASE.to_string(), v.clone());
        }
        if let Some(v) = &self.model_id {
            map.insert(keys::MODEL_ID.to_string(), v.clone());
        }
        if let Some(v) = &self.embedding_model_id {
            map.insert(keys::EMBEDDING_MODEL_ID.to_string(), v.clone());
        }
        map.insert(
            keys::CLAIM_EXTRACTION.to_string(),
            if self.claim_extraction { "True" } else { "False" }.to_string(),
        );
        map
    }

    /// Persist to an env-style store
    pub fn save(&self, store: &EnvStore) -> Result<()> {
        store.write(&self.to_map())
    }
}
