//! `KEY=value` env-style file store
//!
//! Format: one `KEY=value` pair per line, values optionally single- or
//! double-quoted, `#` starts a comment. Opening a store creates the file
//! when it is absent. Writes rewrite the whole file (not transactional).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use grag_core::Result;

/// Store over a single env-style file
#[derive(Debug, Clone)]
pub struct EnvStore {
    path: PathBuf,
}

impl EnvStore {
    /// Open a store, creating an empty file when none exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&path, "")?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all key-value pairs
    pub fn read_all(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.read_pairs()?.into_iter().collect())
    }

    /// Look up a single key
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    /// Merge-write the given pairs; existing unrelated keys are preserved,
    /// every value is serialized as a double-quoted string
    pub fn write(&self, vars: &BTreeMap<String, String>) -> Result<()> {
        let mut pairs = self.read_pairs()?;
        for (key, value) in vars {
            match pairs.iter_mut().find(|(k, _)| k == key) {
                Some((_, v)) => *v = value.clone(),
                None => pairs.push((key.clone(), value.clone())),
            }
        }
        self.write_pairs(&pairs)
    }

    /// Remove the listed keys; absent keys are a no-op
    pub fn delete(&self, keys: &[&str]) -> Result<()> {
        let mut pairs = self.read_pairs()?;
        pairs.retain(|(k, _)| !keys.contains(&k.as_str()));
        self.write_pairs(&pairs)
    }

    fn read_pairs(&self) -> Result<Vec<(String, String)>> {
        let text = fs::read_to_string(&self.path)?;
        let mut pairs = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                pairs.push((key.trim().to_string(), unquote(value.trim()).to_string()));
            }
        }
        Ok(pairs)
    }

    fn write_pairs(&self, pairs: &[(String, String)]) -> Result<()> {
        let mut text = String::new();
        for (key, value) in pairs {
            text.push_str(&format!("{}=\"{}\"\n", key, value));
        }
        fs::write(&self.path, text)?;
        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        assert!(!path.exists());
        let store = EnvStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempdir().unwrap();
        let store = EnvStore::open(dir.path().join(".env")).unwrap();

        let mut vars = BTreeMap::new();
        vars.insert("GRAPHRAG_API_KEY".to_string(), "abc".to_string());
        vars.insert("MODEL_ID".to_string(), "glm-4".to_string());
        store.write(&vars).unwrap();

        assert_eq!(store.read_all().unwrap(), vars);
    }

    #[test]
    fn test_values_written_quoted() {
        let dir = tempdir().unwrap();
        let store = EnvStore::open(dir.path().join(".env")).unwrap();

        let mut vars = BTreeMap::new();
        vars.insert("KEY".to_string(), "value".to_string());
        store.write(&vars).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "KEY=\"value\"\n");
    }

    #[test]
    fn test_comments_and_quotes_parsed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# a comment\nPLAIN=one\nDOUBLE=\"two\"\nSINGLE='three'\n\n",
        )
        .unwrap();

        let store = EnvStore::open(&path).unwrap();
        let vars = store.read_all().unwrap();
        assert_eq!(vars.get("PLAIN").map(String::as_str), Some("one"));
        assert_eq!(vars.get("DOUBLE").map(String::as_str), Some("two"));
        assert_eq!(vars.get("SINGLE").map(String::as_str), Some("three"));
    }

    #[test]
    fn test_value_with_equals_sign() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "URL=https://host/a?b=c\n").unwrap();

        let store = EnvStore::open(&path).unwrap();
        assert_eq!(
            store.get("URL").unwrap().as_deref(),
            Some("https://host/a?b=c")
        );
    }

    #[test]
    fn test_merge_write_preserves_existing_keys() {
        let dir = tempdir().unwrap();
        let store = EnvStore::open(dir.path().join(".env")).unwrap();

        let mut first = BTreeMap::new();
        first.insert("A".to_string(), "1".to_string());
        store.write(&first).unwrap();

        let mut second = BTreeMap::new();
        second.insert("B".to_string(), "2".to_string());
        store.write(&second).unwrap();

        let vars = store.read_all().unwrap();
        assert_eq!(vars.get("A").map(String::as_str), Some("1"));
        assert_eq!(vars.get("B").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let dir = tempdir().unwrap();
        let store = EnvStore::open(dir.path().join(".env")).unwrap();

        let mut vars = BTreeMap::new();
        vars.insert("KEEP".to_string(), "yes".to_string());
        store.write(&vars).unwrap();

        store.delete(&["NEVER_WRITTEN"]).unwrap();
        assert_eq!(store.read_all().unwrap(), vars);
    }

    #[test]
    fn test_delete_removes_key() {
        let dir = tempdir().unwrap();
        let store = EnvStore::open(dir.path().join(".env")).unwrap();

        let mut vars = BTreeMap::new();
        vars.insert("A".to_string(), "1".to_string());
        vars.insert("B".to_string(), "2".to_string());
        store.write(&vars).unwrap();

        store.delete(&["A"]).unwrap();
        let remaining = store.read_all().unwrap();
        assert!(!remaining.contains_key("A"));
        assert!(remaining.contains_key("B"));
    }
}
