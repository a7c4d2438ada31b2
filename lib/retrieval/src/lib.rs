//! # stylist retrieval
//!
//! Turns a [`stylist_catalog::Catalog`] and a customer profile into ranked
//! products.
//!
//! - [`EmbeddingProvider`] with local ([`HashEmbedder`]) and HTTP
//!   ([`OpenAiEmbedder`]) implementations, plus [`RetryingEmbedder`]
//! - [`EmbeddingCache`] so each distinct text is embedded once
//! - [`SemanticIndex`], generic over any [`Embeddable`] entity
//! - [`RetrievalEngine`]: over-fetch, filter, boost, re-sort; popularity
//!   fallback when embedding is unavailable
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stylist_catalog::{Catalog, Product};
//! use stylist_retrieval::{HashEmbedder, Query, RetrievalConfig, RetrievalEngine};
//!
//! let engine = RetrievalEngine::new(Arc::new(HashEmbedder::new(64)), RetrievalConfig::default()).unwrap();
//! engine
//!     .refresh(Catalog::new(vec![Product::new("p1", "Runner", "shoes", 60.0, "light running shoe")]).unwrap())
//!     .unwrap();
//!
//! let result = engine.recommend(&Query::text("running shoes"), None, 3).unwrap();
//! assert_eq!(result.ids(), vec!["p1"]);
//! ```

pub mod cache;
pub mod config;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod openai;
pub mod rerank;
pub mod semantic;

pub use cache::EmbeddingCache;
pub use config::{BoostWeights, EmbeddingConfig, PopularityWeights, ProviderKind, RetrievalConfig};
pub use embedder::{EmbeddingProvider, HashEmbedder, RetryingEmbedder};
pub use engine::{IndexSnapshot, Query, ResultSource, RetrievalEngine, SearchResult};
pub use error::{BuildError, ConfigError, EmbedError, RecommendError};
pub use openai::OpenAiEmbedder;
pub use rerank::{Reranker, ScoredProduct};
pub use semantic::{embed_all, EmbedText, Embeddable, SemanticIndex};
