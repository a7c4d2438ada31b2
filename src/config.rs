//! Top-level configuration, loaded from a JSON file.
//!
//! Every field has a default, so `{}` is a valid configuration and a file
//! only needs the values it changes:
//!
//! ```json
//! {
//!   "retrieval": { "overfetch_factor": 4, "boosts": { "wishlist": 0.2 } },
//!   "embedding": { "provider": "openai", "dim": 512 },
//!   "data": { "catalog": "data/products.csv" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stylist_body::{BodyShapeClassifier, ClassifierConfig};
use stylist_catalog::SignalConfig;
use stylist_retrieval::{EmbeddingConfig, RetrievalConfig};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Default locations of the input tables and the artifact directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub catalog: Option<PathBuf>,
    pub events: Option<PathBuf>,
    pub customers: Option<PathBuf>,
    pub advice: Option<PathBuf>,
    pub artifacts_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylistConfig {
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub classifier: ClassifierConfig,
    pub signals: SignalConfig,
    pub data: DataPaths,
}

impl StylistConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Check every section before anything is built from it
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retrieval
            .validate()
            .map_err(|e| ConfigError::Invalid(e.0))?;
        self.embedding
            .validate()
            .map_err(|e| ConfigError::Invalid(e.0))?;
        BodyShapeClassifier::new(&self.classifier).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.signals.recent_query_limit == 0 {
            return Err(ConfigError::Invalid("signals.recent_query_limit must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use stylist_retrieval::ProviderKind;

    #[test]
    fn test_empty_object_is_default() {
        let config = StylistConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StylistConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config = StylistConfig::from_json_str(
            r#"{"retrieval": {"overfetch_factor": 5}, "embedding": {"provider": "openai", "dim": 64}}"#,
        )
        .unwrap();
        assert_eq!(config.retrieval.overfetch_factor, 5);
        assert_eq!(config.retrieval.history_window, RetrievalConfig::default().history_window);
        assert_eq!(config.embedding.provider, ProviderKind::OpenAi);
        assert_eq!(config.embedding.dim, 64);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = StylistConfig::default();
        config.embedding.dim = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = StylistConfig::default();
        config.classifier.male.waist_hips.lower = 2.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_json_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"data": {{"catalog": "products.csv"}}}}"#).unwrap();
        let config = StylistConfig::from_json_path(file.path()).unwrap();
        assert_eq!(config.data.catalog, Some(PathBuf::from("products.csv")));

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        write!(broken, "{{not json").unwrap();
        assert!(matches!(
            StylistConfig::from_json_path(broken.path()),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            StylistConfig::from_json_path("/nonexistent/stylist.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
