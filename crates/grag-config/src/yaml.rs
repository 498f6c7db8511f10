//! Engine settings document (`settings.yaml`) store
//!
//! The document is an arbitrary nested mapping owned by the external
//! engine; only a handful of keys are ever touched by reconciliation.
//! Writes overwrite the document wholesale.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use grag_core::{Error, Result};

/// Store over a single YAML settings file
#[derive(Debug, Clone)]
pub struct YamlStore {
    path: PathBuf,
}

impl YamlStore {
    /// Open a store, creating a file holding an empty mapping when absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&path, "{}\n")?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; empty or null documents come back as an empty mapping
    pub fn read(&self) -> Result<Mapping> {
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Mapping::new());
        }
        let value: Value = serde_yaml::from_str(&text)
            .map_err(|e| Error::Serialization(format!("{}: {}", self.path.display(), e)))?;
        match value {
            Value::Mapping(mapping) => Ok(mapping),
            Value::Null => Ok(Mapping::new()),
            other => Err(Error::Serialization(format!(
                "{}: expected a mapping at the document root, found {:?}",
                self.path.display(),
                other
            ))),
        }
    }

    /// Overwrite the document
    pub fn write(&self, doc: &Mapping) -> Result<()> {
        let text = serde_yaml::to_string(doc)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

/// Walk to (and create) the nested child mapping at `key`
pub(crate) fn child_mapping<'a>(parent: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    let k = Value::String(key.to_string());
    let slot = parent
        .entry(k)
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !slot.is_mapping() {
        *slot = Value::Mapping(Mapping::new());
    }
    match slot {
        Value::Mapping(m) => m,
        _ => unreachable!("slot was just set to a mapping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_empty_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        let store = YamlStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.read().unwrap().is_empty());
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempdir().unwrap();
        let store = YamlStore::open(dir.path().join("settings.yaml")).unwrap();

        let mut llm = Mapping::new();
        llm.insert(
            Value::String("model".to_string()),
            Value::String("glm-4".to_string()),
        );
        let mut doc = Mapping::new();
        doc.insert(Value::String("llm".to_string()), Value::Mapping(llm));
        store.write(&doc).unwrap();

        assert_eq!(store.read().unwrap(), doc);
    }

    #[test]
    fn test_child_mapping_creates_intermediates() {
        let mut doc = Mapping::new();
        {
            let embeddings = child_mapping(&mut doc, "embeddings");
            let llm = child_mapping(embeddings, "llm");
            llm.insert(
                Value::String("model".to_string()),
                Value::String("embedding-3".to_string()),
            );
        }
        let nested = doc
            .get(Value::String("embeddings".to_string()))
            .and_then(|v| v.get("llm"))
            .and_then(|v| v.get("model"));
        assert_eq!(nested, Some(&Value::String("embedding-3".to_string())));
    }

    #[test]
    fn test_child_mapping_replaces_scalar() {
        let mut doc = Mapping::new();
        doc.insert(
            Value::String("llm".to_string()),
            Value::String("not a mapping".to_string()),
        );
        let llm = child_mapping(&mut doc, "llm");
        assert!(llm.is_empty());
    }
}
