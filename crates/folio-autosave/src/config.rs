use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AutosaveError, AutosaveResult};
use crate::storage::DEFAULT_NAMESPACE;

pub const AUTOSAVE_CONFIG_FILENAME: &str = "autosave.json";
pub const AUTOSAVE_CONFIG_VERSION: &str = "1.0.0";
pub const DEFAULT_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_IDENTITY_FIELD: &str = "id";

pub const ENV_NAMESPACE: &str = "FOLIO_AUTOSAVE_NAMESPACE";
pub const ENV_INTERVAL_MS: &str = "FOLIO_AUTOSAVE_INTERVAL_MS";
pub const ENV_DIR: &str = "FOLIO_AUTOSAVE_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub version: String,
    /// Prefix for every storage key the snapshot store writes.
    pub namespace: String,
    pub interval_ms: u64,
    pub storage_dir: PathBuf,
    /// Field of the form state that carries the document's server id.
    pub identity_field: String,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self::default_new()
    }
}

impl AutosaveConfig {
    pub fn default_new() -> Self {
        Self {
            version: AUTOSAVE_CONFIG_VERSION.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            interval_ms: DEFAULT_INTERVAL_MS,
            storage_dir: default_storage_dir(),
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> AutosaveResult<()> {
        if self.interval_ms == 0 {
            return Err(AutosaveError::Config(
                "interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.namespace.is_empty() {
            return Err(AutosaveError::Config("namespace must not be empty".to_string()));
        }
        if self.identity_field.is_empty() {
            return Err(AutosaveError::Config(
                "identity_field must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Override fields from `FOLIO_AUTOSAVE_*` environment variables.
    pub fn apply_env(self) -> AutosaveResult<Self> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AutosaveResult<Self> {
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            self.namespace = namespace;
        }
        if let Some(interval) = lookup(ENV_INTERVAL_MS) {
            self.interval_ms = interval.trim().parse().map_err(|error| {
                AutosaveError::Config(format!("invalid {ENV_INTERVAL_MS} {interval:?}: {error}"))
            })?;
        }
        if let Some(dir) = lookup(ENV_DIR) {
            self.storage_dir = PathBuf::from(dir);
        }
        self.validate()?;
        Ok(self)
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("folio")
        .join("autosave")
}

pub fn load_or_create_config(dir: &Path) -> AutosaveResult<AutosaveConfig> {
    std::fs::create_dir_all(dir).map_err(|error| {
        AutosaveError::Config(format!(
            "failed to create config directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = config_path(dir);
    if !path.exists() {
        let config = AutosaveConfig::default_new();
        write_config(&path, &config)?;
        return Ok(config);
    }

    let data = std::fs::read_to_string(&path).map_err(|error| {
        AutosaveError::Config(format!(
            "failed to read autosave config {}: {error}",
            path.display()
        ))
    })?;
    let config: AutosaveConfig = serde_json::from_str(&data).map_err(|error| {
        AutosaveError::Config(format!(
            "failed to parse autosave config {}: {error}",
            path.display()
        ))
    })?;

    if config.version != AUTOSAVE_CONFIG_VERSION {
        return Err(AutosaveError::Config(format!(
            "unsupported autosave config version {} in {}",
            config.version,
            path.display()
        )));
    }
    config.validate()?;
    Ok(config)
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(AUTOSAVE_CONFIG_FILENAME)
}

pub fn write_config(path: &Path, config: &AutosaveConfig) -> AutosaveResult<()> {
    let data = serde_json::to_string_pretty(config).map_err(|error| {
        AutosaveError::Config(format!(
            "failed to serialize autosave config {}: {error}",
            path.display()
        ))
    })?;
    std::fs::write(path, data).map_err(|error| {
        AutosaveError::Config(format!(
            "failed to write autosave config {}: {error}",
            path.display()
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let config = AutosaveConfig::default_new();
        assert_eq!(config.interval(), Duration::from_millis(5_000));
        assert_eq!(config.namespace, "autosave_");
        assert_eq!(config.identity_field, "id");
        assert!(config.storage_dir.ends_with("folio/autosave"));
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn creates_config_when_missing() {
        let dir = tempdir().expect("tempdir");
        let config = load_or_create_config(dir.path()).expect("load/create");

        assert!(config_path(dir.path()).exists());
        assert_eq!(config.version, AUTOSAVE_CONFIG_VERSION);
    }

    #[test]
    fn loads_existing_config() {
        let dir = tempdir().expect("tempdir");
        let mut written = AutosaveConfig::default_new();
        written.interval_ms = 1_500;
        written.storage_dir = dir.path().join("drafts");
        write_config(&config_path(dir.path()), &written).expect("write config");

        let loaded = load_or_create_config(dir.path()).expect("load config");
        assert_eq!(loaded, written);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(config_path(dir.path()), r#"{ "interval_ms": 2000 }"#).expect("write");

        let loaded = load_or_create_config(dir.path()).expect("load config");
        assert_eq!(loaded.interval_ms, 2_000);
        assert_eq!(loaded.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let mut written = AutosaveConfig::default_new();
        written.version = "0.9.0".to_string();
        write_config(&config_path(dir.path()), &written).expect("write config");

        let err = load_or_create_config(dir.path()).expect_err("expected error");
        match err {
            AutosaveError::Config(message) => assert!(message.contains("0.9.0")),
            other => panic!("expected Config, got {other:?}"),
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = AutosaveConfig::default_new();
        config.interval_ms = 0;
        assert!(matches!(config.validate(), Err(AutosaveError::Config(_))));
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_NAMESPACE, "cms_"),
            (ENV_INTERVAL_MS, " 750 "),
            (ENV_DIR, "/var/lib/folio"),
        ]);
        let config = AutosaveConfig::default_new()
            .apply_env_from(|name| vars.get(name).map(|value| value.to_string()))
            .expect("apply env");

        assert_eq!(config.namespace, "cms_");
        assert_eq!(config.interval_ms, 750);
        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/folio"));
    }

    #[test]
    fn env_rejects_bad_interval() {
        let err = AutosaveConfig::default_new()
            .apply_env_from(|name| (name == ENV_INTERVAL_MS).then(|| "soon".to_string()))
            .expect_err("bad interval");
        assert!(matches!(err, AutosaveError::Config(_)));

        let err = AutosaveConfig::default_new()
            .apply_env_from(|name| (name == ENV_INTERVAL_MS).then(|| "0".to_string()))
            .expect_err("zero interval");
        assert!(matches!(err, AutosaveError::Config(_)));
    }
}
