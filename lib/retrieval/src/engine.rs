//! Product retrieval engine
//!
//! Serves queries against an immutable [`IndexSnapshot`]. A refresh builds a
//! complete new snapshot outside the lock and swaps the pointer, so queries
//! never see a partial index and a failed build leaves the old one serving.
//! After a swap the embedding cache keeps only the texts the new snapshot
//! indexes.

use crate::rerank::sort_scored;
use crate::{
    BuildError, ConfigError, EmbeddingCache, EmbeddingProvider, RecommendError, Reranker, RetrievalConfig,
    ScoredProduct, SemanticIndex,
};
use ahash::AHashSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stylist_catalog::{Catalog, CustomerProfile, EmbeddingArtifacts, Filter, Product, ProductFilter};
use stylist_core::{Gender, Vector};
use tracing::{debug, info, warn};

/// A recommendation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub text: Option<String>,
    pub customer_id: Option<String>,
    pub filters: ProductFilter,
    /// Prefixes the query text and, when enabled, filters by orientation
    pub gender: Option<Gender>,
}

impl Query {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: ProductFilter) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    fn non_blank_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Embedded query text
    Semantic,
    /// Mean embedding of the customer's recent items
    History,
    /// Embedding-free discount and trend ranking
    Popularity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub items: Vec<ScoredProduct>,
    pub source: ResultSource,
}

impl SearchResult {
    pub fn empty(source: ResultSource) -> Self {
        Self {
            items: Vec::new(),
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.product_id.as_str()).collect()
    }
}

/// Catalog, index and trending set served together
#[derive(Debug)]
pub struct IndexSnapshot {
    pub generation: u64,
    pub catalog: Arc<Catalog>,
    pub index: SemanticIndex<Product>,
    pub trending: AHashSet<String>,
    pub max_trend: f64,
}

pub struct RetrievalEngine {
    config: RetrievalConfig,
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    reranker: Reranker,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    generations: AtomicU64,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("config", &self.config)
            .field("model", &self.provider.model_name())
            .field("generation", &self.snapshot.read().generation)
            .finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    /// An engine serving an empty catalog until the first [`refresh`](Self::refresh)
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: RetrievalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if provider.dimension() == 0 {
            return Err(ConfigError("embedding dimension must be positive".to_string()));
        }

        let empty = IndexSnapshot {
            generation: 0,
            catalog: Arc::new(Catalog::default()),
            index: SemanticIndex::empty(config.index),
            trending: AHashSet::new(),
            max_trend: 0.0,
        };
        Ok(Self {
            cache: EmbeddingCache::for_provider(provider.as_ref()),
            reranker: Reranker::new(config.boosts),
            snapshot: RwLock::new(Arc::new(empty)),
            generations: AtomicU64::new(0),
            provider,
            config,
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// The snapshot currently served
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Seed the embedding cache from persisted artifacts
    pub fn seed_cache(&self, artifacts: &EmbeddingArtifacts) -> usize {
        self.cache.seed(artifacts)
    }

    /// Artifacts for the served snapshot
    pub fn artifacts(&self) -> EmbeddingArtifacts {
        let snapshot = self.snapshot();
        EmbeddingArtifacts::new(
            self.provider.model_name(),
            self.provider.dimension(),
            snapshot.index.entries().to_vec(),
        )
    }

    /// Build a snapshot for `catalog` and swap it in.
    ///
    /// Generations are assigned when a refresh starts. When refreshes race,
    /// the one that started last is served whatever order they finish in.
    pub fn refresh(&self, catalog: Catalog) -> Result<Arc<IndexSnapshot>, BuildError> {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = self.build_snapshot(catalog, generation)?;
        Ok(self.install(snapshot))
    }

    fn build_snapshot(&self, catalog: Catalog, generation: u64) -> Result<IndexSnapshot, BuildError> {
        let catalog = Arc::new(catalog);
        let index = SemanticIndex::build(
            catalog.products(),
            self.config.embed_text,
            self.provider.as_ref(),
            &self.cache,
            self.config.index,
        )?;
        let trending = catalog
            .trending_ids(self.config.trending_top_n)
            .into_iter()
            .collect();

        Ok(IndexSnapshot {
            generation,
            max_trend: catalog.max_trend_score(),
            catalog,
            index,
            trending,
        })
    }

    /// Swap `snapshot` in unless a newer one is already served; returns the
    /// snapshot served afterwards
    fn install(&self, snapshot: IndexSnapshot) -> Arc<IndexSnapshot> {
        let mut served = self.snapshot.write();
        if served.generation > snapshot.generation {
            debug!(
                stale = snapshot.generation,
                served = served.generation,
                "Discarding snapshot older than the one served"
            );
            return Arc::clone(&*served);
        }

        let snapshot = Arc::new(snapshot);
        *served = Arc::clone(&snapshot);
        drop(served);

        let live: AHashSet<String> = snapshot
            .index
            .entries()
            .iter()
            .map(|e| e.text_hash.clone())
            .collect();
        let evicted = self.cache.retain(&live);
        debug!(evicted, cached = self.cache.len(), "Pruned embedding cache");
        info!(
            generation = snapshot.generation,
            products = snapshot.catalog.len(),
            indexed = snapshot.index.index().len(),
            "Swapped in new index snapshot"
        );
        snapshot
    }

    /// Rank up to `k` products for `query`.
    ///
    /// Text queries are embedded; without text the customer's recent items
    /// are averaged; with neither the popularity ranking is returned.
    pub fn recommend(
        &self,
        query: &Query,
        profile: Option<&CustomerProfile>,
        k: usize,
    ) -> Result<SearchResult, RecommendError> {
        if k == 0 {
            return Err(RecommendError::InvalidK);
        }
        let snapshot = self.snapshot();
        if snapshot.catalog.is_empty() {
            return Ok(SearchResult::empty(ResultSource::Semantic));
        }

        let gender = query.gender.or_else(|| profile.and_then(CustomerProfile::gender));
        let mut filter = query.filters.clone();
        if self.config.filter_by_gender && filter.gender.is_none() {
            filter.gender = gender;
        }

        let (vector, source) = if let Some(text) = query.non_blank_text() {
            let text = match gender {
                Some(g) => format!("{} {}", g.query_hint(), text),
                None => text.to_string(),
            };
            match self.provider.embed(&text) {
                Ok(vector) => (vector, ResultSource::Semantic),
                Err(err) if self.config.fallback_to_popularity => {
                    warn!(error = %err, "Embedding unavailable, serving popularity ranking");
                    return Ok(self.rank_by_popularity(&snapshot, &filter, profile, k));
                }
                Err(err) => return Err(RecommendError::EmbeddingUnavailable(err)),
            }
        } else {
            match profile.and_then(|p| self.history_vector(&snapshot, p)) {
                Some(vector) => (vector, ResultSource::History),
                None => {
                    debug!("No query text or usable history, serving popularity ranking");
                    return Ok(self.rank_by_popularity(&snapshot, &filter, profile, k));
                }
            }
        };

        let fetch = k.saturating_mul(self.config.overfetch_factor);
        let hits = snapshot.index.search(&vector, fetch)?;
        let candidates: Vec<(&Product, f32)> = hits
            .iter()
            .filter_map(|hit| snapshot.catalog.get(&hit.id).map(|p| (p, hit.score)))
            .filter(|(product, _)| filter.matches(product))
            .collect();
        debug!(
            hits = hits.len(),
            kept = candidates.len(),
            ?source,
            "Filtered search candidates"
        );

        let items = self.reranker.rerank(candidates, profile, &snapshot.trending, k);
        Ok(SearchResult { items, source })
    }

    /// Embedding-free ranking by discount and trend
    pub fn popularity(&self, filter: &ProductFilter, k: usize) -> Result<SearchResult, RecommendError> {
        if k == 0 {
            return Err(RecommendError::InvalidK);
        }
        Ok(self.rank_by_popularity(&self.snapshot(), filter, None, k))
    }

    pub fn trending(&self, k: usize, gender: Option<Gender>) -> Vec<Product> {
        self.snapshot()
            .catalog
            .trending(k, gender)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn discounted(&self, k: usize, gender: Option<Gender>) -> Vec<Product> {
        self.snapshot()
            .catalog
            .top_discounted(k, gender)
            .into_iter()
            .cloned()
            .collect()
    }

    fn history_vector(&self, snapshot: &IndexSnapshot, profile: &CustomerProfile) -> Option<Vector> {
        let recent = profile.recent_items(self.config.history_window);
        let mean = Vector::mean(recent.iter().filter_map(|id| snapshot.index.vector(id)))?;
        mean.normalized()
    }

    fn rank_by_popularity(
        &self,
        snapshot: &IndexSnapshot,
        filter: &ProductFilter,
        profile: Option<&CustomerProfile>,
        k: usize,
    ) -> SearchResult {
        let weights = self.config.popularity;
        let mut items: Vec<ScoredProduct> = snapshot
            .catalog
            .iter()
            .filter(|p| filter.matches(p))
            .map(|p| {
                let trend = if snapshot.max_trend > 0.0 {
                    p.trend_score() / snapshot.max_trend
                } else {
                    0.0
                };
                let base = (weights.discount * p.discount_fraction() + weights.trend * trend) as f32;
                let boost = profile.map_or(0.0, |profile| self.reranker.boost(p, Some(profile), &AHashSet::new()));
                ScoredProduct {
                    product_id: p.id.clone(),
                    similarity: 0.0,
                    boost,
                    score: base + boost,
                }
            })
            .collect();
        sort_scored(&mut items);
        items.truncate(k);
        SearchResult {
            items,
            source: ResultSource::Popularity,
        }
    }
}
