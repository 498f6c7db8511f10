//! Reconciliation: copy user-facing config keys into the engine's format
//!
//! The API key goes into the engine-facing env file; the model and API-base
//! fields go into `settings.yaml`. When a user key is absent the existing
//! YAML value is kept. The claim-extraction flag is written as a real
//! boolean (the engine's schema expects one).

use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::yaml::child_mapping;
use crate::{keys, EnvStore, YamlStore};
use grag_core::Result;

/// Reconcile the user config into the engine env file and settings document
pub fn reconcile(
    user_env_path: &Path,
    engine_env_path: &Path,
    settings_path: &Path,
) -> Result<()> {
    let user_store = EnvStore::open(user_env_path)?;
    let user = user_store.read_all()?;

    let engine_store = EnvStore::open(engine_env_path)?;
    if let Some(api_key) = user.get(keys::API_KEY) {
        let mut api_key_config = BTreeMap::new();
        api_key_config.insert(keys::API_KEY.to_string(), api_key.clone());
        engine_store.write(&api_key_config)?;
    }

    let settings_store = YamlStore::open(settings_path)?;
    let mut settings = settings_store.read()?;

    {
        let llm = child_mapping(&mut settings, "llm");
        set_string(llm, "model", user.get(keys::MODEL_ID));
        set_string(llm, "api_base", user.get(keys::API_BASE));
    }
    {
        let embeddings = child_mapping(&mut settings, "embeddings");
        let llm = child_mapping(embeddings, "llm");
        set_string(llm, "model", user.get(keys::EMBEDDING_MODEL_ID));
        set_string(llm, "api_base", user.get(keys::API_BASE));
    }
    {
        let enabled = user.get(keys::CLAIM_EXTRACTION).map(String::as_str) == Some("True");
        let claim_extraction = child_mapping(&mut settings, "claim_extraction");
        claim_extraction.insert(
            Value::String("enabled".to_string()),
            Value::Bool(enabled),
        );
    }

    settings_store.write(&settings)
}

/// Set `key` from the user value, keeping the existing entry when absent
fn set_string(mapping: &mut serde_yaml::Mapping, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        mapping.insert(
            Value::String(key.to_string()),
            Value::String(value.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_user_env(path: &Path, pairs: &[(&str, &str)]) {
        let store = EnvStore::open(path).unwrap();
        let mut map = BTreeMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        store.write(&map).unwrap();
    }

    #[test]
    fn test_reconcile_scenario() {
        let dir = tempdir().unwrap();
        let user_env = dir.path().join(".env");
        let engine_env = dir.path().join("ragtest/.env");
        let settings = dir.path().join("ragtest/settings.yaml");

        write_user_env(
            &user_env,
            &[("GRAPHRAG_API_KEY", "abc"), ("MODEL_ID", "glm-4")],
        );
        fs::create_dir_all(dir.path().join("ragtest")).unwrap();
        fs::write(&settings, "llm:\n  model: old-model\n").unwrap();

        reconcile(&user_env, &engine_env, &settings).unwrap();

        let doc = YamlStore::open(&settings).unwrap().read().unwrap();
        let model = doc.get("llm").and_then(|v| v.get("model"));
        assert_eq!(model, Some(&Value::String("glm-4".to_string())));

        let engine = EnvStore::open(&engine_env).unwrap();
        assert_eq!(
            engine.get("GRAPHRAG_API_KEY").unwrap().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_reconcile_falls_back_to_existing_yaml() {
        let dir = tempdir().unwrap();
        let user_env = dir.path().join(".env");
        let engine_env = dir.path().join("engine.env");
        let settings = dir.path().join("settings.yaml");

        write_user_env(&user_env, &[("GRAPHRAG_API_KEY", "abc")]);
        fs::write(
            &settings,
            "llm:\n  model: existing-model\n  api_base: https://existing/\n",
        )
        .unwrap();

        reconcile(&user_env, &engine_env, &settings).unwrap();

        let doc = YamlStore::open(&settings).unwrap().read().unwrap();
        let model = doc.get("llm").and_then(|v| v.get("model"));
        assert_eq!(model, Some(&Value::String("existing-model".to_string())));
        let api_base = doc.get("llm").and_then(|v| v.get("api_base"));
        assert_eq!(
            api_base,
            Some(&Value::String("https://existing/".to_string()))
        );
    }

    #[test]
    fn test_reconcile_claim_flag_written_as_bool() {
        let dir = tempdir().unwrap();
        let user_env = dir.path().join(".env");
        let engine_env = dir.path().join("engine.env");
        let settings = dir.path().join("settings.yaml");

        write_user_env(
            &user_env,
            &[("GRAPHRAG_API_KEY", "abc"), ("CLAIM_EXTRACTION", "True")],
        );

        reconcile(&user_env, &engine_env, &settings).unwrap();

        let doc = YamlStore::open(&settings).unwrap().read().unwrap();
        let enabled = doc.get("claim_extraction").and_then(|v| v.get("enabled"));
        assert_eq!(enabled, Some(&Value::Bool(true)));

        // anything other than the exact string "True" disables the flag
        write_user_env(&user_env, &[("CLAIM_EXTRACTION", "true")]);
        reconcile(&user_env, &engine_env, &settings).unwrap();
        let doc = YamlStore::open(&settings).unwrap().read().unwrap();
        let enabled = doc.get("claim_extraction").and_then(|v| v.get("enabled"));
        assert_eq!(enabled, Some(&Value::Bool(false)));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let dir = tempdir().unwrap();
        let user_env = dir.path().join(".env");
        let engine_env = dir.path().join("engine.env");
        let settings = dir.path().join("settings.yaml");

        write_user_env(
            &user_env,
            &[
                ("GRAPHRAG_API_KEY", "abc"),
                ("MODEL_ID", "glm-4"),
                ("EMBEDDING_MODEL_ID", "embedding-3"),
                ("API_BASE", "https://open.bigmodel.cn/api/paas/v4/"),
                ("CLAIM_EXTRACTION", "True"),
            ],
        );

        reconcile(&user_env, &engine_env, &settings).unwrap();
        let first = fs::read_to_string(&settings).unwrap();
        let first_env = fs::read_to_string(&engine_env).unwrap();

        reconcile(&user_env, &engine_env, &settings).unwrap();
        let second = fs::read_to_string(&settings).unwrap();
        let second_env = fs::read_to_string(&engine_env).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_env, second_env);
    }

    #[test]
    fn test_reconcile_creates_missing_files() {
        let dir = tempdir().unwrap();
        let user_env = dir.path().join(".env");
        let engine_env = dir.path().join("ws/.env");
        let settings = dir.path().join("ws/settings.yaml");

        reconcile(&user_env, &engine_env, &settings).unwrap();

        assert!(user_env.exists());
        assert!(settings.exists());
        let doc = YamlStore::open(&settings).unwrap().read().unwrap();
        let enabled = doc.get("claim_extraction").and_then(|v| v.get("enabled"));
        assert_eq!(enabled, Some(&Value::Bool(false)));
    }
}
