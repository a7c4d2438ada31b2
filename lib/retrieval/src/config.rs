use crate::{ConfigError, EmbedError, EmbedText, EmbeddingProvider, HashEmbedder, OpenAiEmbedder, RetryingEmbedder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use stylist_core::{IndexConfig, IndexKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local hashed-trigram embedder, no network
    #[default]
    Hash,
    /// OpenAI-compatible HTTP endpoint
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub dim: usize,
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Attempts per request, the first included
    pub max_attempts: usize,
    pub backoff_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Hash,
            dim: 256,
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            backoff_ms: 500,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dim == 0 {
            return Err(ConfigError("embedding dim must be positive".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError("max_attempts must be at least 1".to_string()));
        }
        if self.provider == ProviderKind::OpenAi && self.timeout_secs == 0 {
            return Err(ConfigError("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Construct the configured provider. The OpenAI key is read from
    /// `api_key_env`.
    pub fn build_provider(&self) -> Result<Arc<dyn EmbeddingProvider>, EmbedError> {
        let backoff = Duration::from_millis(self.backoff_ms);
        match self.provider {
            ProviderKind::Hash => Ok(Arc::new(HashEmbedder::new(self.dim))),
            ProviderKind::OpenAi => {
                let api_key = std::env::var(&self.api_key_env)
                    .map_err(|_| EmbedError::Config(format!("environment variable {} is not set", self.api_key_env)))?;
                let client = OpenAiEmbedder::new(
                    &api_key,
                    &self.base_url,
                    &self.model,
                    self.dim,
                    true,
                    Duration::from_secs(self.timeout_secs),
                )?;
                Ok(Arc::new(RetryingEmbedder::new(client, self.max_attempts, backoff)))
            }
        }
    }
}

/// Additive score boosts applied after vector search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostWeights {
    /// Product category appears in the customer's category affinity
    pub category_affinity: f32,
    pub wishlist: f32,
    pub abandoned_cart: f32,
    /// Multiplied by the discount fraction and by `1 + price_sensitivity`
    pub discount: f32,
    /// Product is among the catalog's top-N trending
    pub trending: f32,
}

impl Default for BoostWeights {
    fn default() -> Self {
        Self {
            category_affinity: 0.10,
            wishlist: 0.15,
            abandoned_cart: 0.10,
            discount: 0.05,
            trending: 0.05,
        }
    }
}

impl BoostWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("category_affinity", self.category_affinity),
            ("wishlist", self.wishlist),
            ("abandoned_cart", self.abandoned_cart),
            ("discount", self.discount),
            ("trending", self.trending),
        ];
        for (name, weight) in fields {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError(format!(
                    "boost weight '{name}' must be a non-negative number, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// Weights of the embedding-free popularity score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopularityWeights {
    pub discount: f64,
    pub trend: f64,
}

impl Default for PopularityWeights {
    fn default() -> Self {
        Self {
            discount: 0.4,
            trend: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub index: IndexConfig,
    pub embed_text: EmbedText,
    /// Candidates fetched per requested result before filtering
    pub overfetch_factor: usize,
    /// Serve the popularity ranking when the provider fails
    pub fallback_to_popularity: bool,
    /// Recent purchases, wishlist and cart items averaged per source when
    /// the query has no text
    pub history_window: usize,
    /// Size of the trending set that earns the trending boost
    pub trending_top_n: usize,
    /// Drop products cut for the other gender when the query has a gender hint
    pub filter_by_gender: bool,
    pub boosts: BoostWeights,
    pub popularity: PopularityWeights,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            embed_text: EmbedText::default(),
            overfetch_factor: 3,
            fallback_to_popularity: true,
            history_window: 5,
            trending_top_n: 10,
            filter_by_gender: true,
            boosts: BoostWeights::default(),
            popularity: PopularityWeights::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.overfetch_factor == 0 {
            return Err(ConfigError("overfetch_factor must be at least 1".to_string()));
        }
        if self.history_window == 0 {
            return Err(ConfigError("history_window must be at least 1".to_string()));
        }
        if self.index.kind == IndexKind::Hnsw
            && (self.index.hnsw.max_connections == 0 || self.index.hnsw.max_layers == 0)
        {
            return Err(ConfigError(
                "hnsw max_connections and max_layers must be positive".to_string(),
            ));
        }
        for (name, weight) in [
            ("popularity.discount", self.popularity.discount),
            ("popularity.trend", self.popularity.trend),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError(format!("{name} must be a non-negative number")));
            }
        }
        self.boosts.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(RetrievalConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: RetrievalConfig =
            serde_json::from_str(r#"{"overfetch_factor": 5, "boosts": {"wishlist": 0.3}}"#).unwrap();
        assert_eq!(config.overfetch_factor, 5);
        assert_eq!(config.boosts.wishlist, 0.3);
        assert_eq!(config.boosts.discount, BoostWeights::default().discount);
        assert!(config.fallback_to_popularity);
    }

    #[test]
    fn test_hash_provider_from_config() {
        let config: EmbeddingConfig = serde_json::from_str(r#"{"dim": 32}"#).unwrap();
        let provider = config.build_provider().unwrap();
        assert_eq!(provider.dimension(), 32);
        assert_eq!(provider.model_name(), "hash-trigram-32");
    }

    #[test]
    fn test_openai_needs_key() {
        let config = EmbeddingConfig {
            provider: ProviderKind::OpenAi,
            api_key_env: "STYLIST_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(config.build_provider(), Err(EmbedError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = RetrievalConfig::default();
        config.boosts.trending = -1.0;
        assert!(config.validate().is_err());

        let config = RetrievalConfig {
            overfetch_factor: 0,
            ..RetrievalConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
