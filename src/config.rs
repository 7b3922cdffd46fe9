//! User configuration at `~/.donreport/config.json`

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::services::FallbackLabels;
use crate::store::{JsonStore, ReportStore, RestStore};
use crate::types::{ReportError, Result};

const CONFIG_DIR: &str = ".donreport";
const CONFIG_FILE: &str = "config.json";

fn default_timeout() -> u64 {
    crate::store::DEFAULT_TIMEOUT_SECS
}

/// Backing store selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Directory of `<table>.json` exports
    Json { dir: PathBuf },
    /// PostgREST-compatible endpoint
    Rest {
        url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Json {
            dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub store: StoreConfig,
    pub labels: FallbackLabels,
    /// Defaults to `~/.donreport/exports`
    pub export_dir: Option<PathBuf>,
}

impl ReportConfig {
    /// Default config location
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ReportError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn export_dir(&self) -> Result<PathBuf> {
        match &self.export_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::home_dir()?.join(CONFIG_DIR).join("exports")),
        }
    }

    /// Open the configured store
    pub fn build_store(&self) -> Result<Arc<dyn ReportStore>> {
        match &self.store {
            StoreConfig::Json { dir } => Ok(Arc::new(JsonStore::open(dir)?)),
            StoreConfig::Rest {
                url,
                api_key,
                timeout_secs,
            } => Ok(Arc::new(RestStore::new(url, api_key.clone(), *timeout_secs)?)),
        }
    }

    fn home_dir() -> Result<PathBuf> {
        BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or_else(|| ReportError::Config("Cannot determine home directory".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ReportConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.labels.unknown_user, "Unknown user");
    }

    #[test]
    fn test_load_rest_store_with_partial_labels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "store": { "kind": "rest", "url": "https://db.example.org" },
                "labels": { "unknown_user": "Usuario desconocido" },
                "export_dir": "/tmp/reports"
            }"#,
        )
        .unwrap();

        let config = ReportConfig::load_from(&path).unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Rest {
                url: "https://db.example.org".into(),
                api_key: None,
                timeout_secs: 10,
            }
        );
        assert_eq!(config.labels.unknown_user, "Usuario desconocido");
        assert_eq!(config.labels.no_deposit, "No deposit");
        assert_eq!(config.labels.no_food_type, "No food type");
        assert_eq!(config.export_dir().unwrap(), PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_corrupt_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ store: ").unwrap();

        assert!(matches!(
            ReportConfig::load_from(&path),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_build_json_store() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("depositos.json"), "[]").unwrap();
        let config = ReportConfig {
            store: StoreConfig::Json {
                dir: dir.path().to_path_buf(),
            },
            ..ReportConfig::default()
        };

        let store = config.build_store().unwrap();
        assert_eq!(store.name(), dir.path().display().to_string());
    }

    #[test]
    fn test_build_json_store_missing_dir_fails() {
        let config = ReportConfig {
            store: StoreConfig::Json {
                dir: PathBuf::from("/nonexistent/donreport"),
            },
            ..ReportConfig::default()
        };
        assert!(config.build_store().is_err());
    }
}
