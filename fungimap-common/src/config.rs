//! Validator configuration loading and storage root resolution
//!
//! The configuration file is a JSON object:
//!
//! ```json
//! {
//!   "validation": {
//!     "required_metadata_fields": ["collection_date", "geo_loc_name"],
//!     "criteria": {
//!       "min_metadata_completeness": 70.0,
//!       "min_read_pairs": 1000000,
//!       "min_fungal_signal": 10.0,
//!       "max_host_contamination": 50.0
//!     }
//!   },
//!   "storage": { "local_path": "/data/fungimap" },
//!   "orchestrator": { "batch_size": 10, "worker_count": 4, "chunk_timeout_secs": 300 },
//!   "logging": { "level": "info" }
//! }
//! ```
//!
//! `orchestrator` and `logging` are optional; `validation` and `storage` are not.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "FUNGIMAP_CONFIG";

/// Environment variable overriding `storage.local_path`
pub const STORAGE_ROOT_ENV_VAR: &str = "FUNGIMAP_STORAGE_ROOT";

/// Configuration file used when neither CLI nor environment names one
pub const DEFAULT_CONFIG_FILE: &str = "fungimap.json";

/// Top-level validator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub validation: ValidationSection,
    pub storage: StorageConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `validation` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSection {
    /// Field names every metadata record must carry, in reporting order
    pub required_metadata_fields: Vec<String>,
    pub criteria: ValidationCriteria,
}

/// Thresholds a sample is compared against
///
/// Immutable once loaded; shared by reference between validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCriteria {
    /// Percent (0-100)
    pub min_metadata_completeness: f64,
    pub min_read_pairs: u64,
    /// Percent of classified reads attributed to Fungi
    pub min_fungal_signal: f64,
    /// Percent of classified reads attributed to the human host
    pub max_host_contamination: f64,
}

impl Default for ValidationCriteria {
    fn default() -> Self {
        Self {
            min_metadata_completeness: 70.0,
            min_read_pairs: 1_000_000,
            min_fungal_signal: 10.0,
            max_host_contamination: 50.0,
        }
    }
}

/// `storage` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding per-sample data and tool reports
    pub local_path: PathBuf,
}

/// `orchestrator` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub batch_size: usize,
    pub worker_count: usize,
    pub chunk_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            worker_count: 4,
            chunk_timeout_secs: 300,
        }
    }
}

impl OrchestratorConfig {
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }
}

/// `logging` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ValidatorConfig {
    /// Load, apply environment overrides, and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_json_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;

        info!(
            config = %path.display(),
            storage_root = %config.storage.local_path.display(),
            required_fields = config.validation.required_metadata_fields.len(),
            "Loaded validator configuration"
        );
        Ok(config)
    }

    /// Parse configuration JSON without touching the environment
    ///
    /// A missing `validation` or `storage` section surfaces here as a
    /// configuration error naming the absent field.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
    }

    /// Replace the storage root with `FUNGIMAP_STORAGE_ROOT` when set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var(STORAGE_ROOT_ENV_VAR) {
            if !root.trim().is_empty() {
                debug!(storage_root = %root, "Storage root overridden from environment");
                self.storage.local_path = PathBuf::from(root);
            }
        }
    }

    /// Reject configurations the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.validation.required_metadata_fields.is_empty() {
            return Err(Error::Config(
                "validation.required_metadata_fields must not be empty".to_string(),
            ));
        }
        if self
            .validation
            .required_metadata_fields
            .iter()
            .any(|f| f.trim().is_empty())
        {
            return Err(Error::Config(
                "validation.required_metadata_fields contains a blank name".to_string(),
            ));
        }
        if self.storage.local_path.as_os_str().is_empty() {
            return Err(Error::Config("storage.local_path must not be empty".to_string()));
        }
        if self.orchestrator.batch_size == 0 {
            return Err(Error::Config("orchestrator.batch_size must be at least 1".to_string()));
        }
        if self.orchestrator.worker_count == 0 {
            return Err(Error::Config(
                "orchestrator.worker_count must be at least 1".to_string(),
            ));
        }
        if self.orchestrator.chunk_timeout_secs == 0 {
            return Err(Error::Config(
                "orchestrator.chunk_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn criteria(&self) -> &ValidationCriteria {
        &self.validation.criteria
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage.local_path
    }
}

/// Configuration file resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. `FUNGIMAP_CONFIG` environment variable
/// 3. `./fungimap.json`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: Working-directory default
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Creates the storage root before any sample is touched
pub struct StorageRootInitializer {
    root: PathBuf,
}

impl StorageRootInitializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage root (and parents) if missing
    ///
    /// Fails when the path exists but is not a directory, or cannot be created.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.root).map_err(|source| Error::Storage {
            path: self.root.clone(),
            source,
        })?;

        info!(storage_root = %self.root.display(), "Created storage root");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "validation": {
            "required_metadata_fields": ["collection_date", "host"],
            "criteria": {
                "min_metadata_completeness": 70.0,
                "min_read_pairs": 1000000,
                "min_fungal_signal": 10.0,
                "max_host_contamination": 50.0
            }
        },
        "storage": { "local_path": "/tmp/fungimap" }
    }"#;

    #[test]
    fn test_optional_sections_default() {
        let config = ValidatorConfig::from_json_str(MINIMAL).unwrap();
        assert_eq!(config.orchestrator, OrchestratorConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.criteria(), &ValidationCriteria::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_storage_section_is_config_error() {
        let json = r#"{
            "validation": {
                "required_metadata_fields": ["host"],
                "criteria": {
                    "min_metadata_completeness": 70.0,
                    "min_read_pairs": 1,
                    "min_fungal_signal": 1.0,
                    "max_host_contamination": 1.0
                }
            }
        }"#;
        let err = ValidatorConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("storage"));
    }

    #[test]
    fn test_zero_worker_count_rejected() {
        let mut config = ValidatorConfig::from_json_str(MINIMAL).unwrap();
        config.orchestrator.worker_count = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_chunk_timeout_duration() {
        let orchestrator = OrchestratorConfig {
            chunk_timeout_secs: 7,
            ..Default::default()
        };
        assert_eq!(orchestrator.chunk_timeout(), Duration::from_secs(7));
    }
}
