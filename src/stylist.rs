//! The `Stylist` facade.
//!
//! Owns one [`RetrievalEngine`], the loaded customer signals, the body shape
//! classifier and its advice table. Catalog and signal tables can be
//! replaced while queries are served; both are swapped as whole snapshots.

use crate::config::StylistConfig;
use crate::error::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use stylist_body::{AdviceRecord, AdviceTable, BodyMeasurements, BodyShapeClassifier, Classification, ShapeLabel};
use stylist_catalog::{
    ArtifactDescription, ArtifactError, ArtifactStore, Catalog, CustomerProfile, Product, ProductFilter,
    SignalAggregator, SignalConfig,
};
use stylist_core::Gender;
use stylist_retrieval::{EmbeddingProvider, Query, RecommendError, RetrievalEngine, SearchResult};
use tracing::{info, warn};

/// Artifact name used for the catalog embeddings
pub const CATALOG_ARTIFACT: &str = "catalog";

/// Classification, its advice and the products matching the advice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Look {
    pub classification: Classification,
    pub advice: AdviceRecord,
    pub query: String,
    pub products: SearchResult,
}

pub struct Stylist {
    engine: RetrievalEngine,
    signals: RwLock<Arc<SignalAggregator>>,
    signal_config: SignalConfig,
    classifier: BodyShapeClassifier,
    advice: AdviceTable,
}

impl std::fmt::Debug for Stylist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stylist")
            .field("engine", &self.engine)
            .field("customers", &self.signals.read().customer_count())
            .field("advice_records", &self.advice.len())
            .finish_non_exhaustive()
    }
}

impl Stylist {
    /// Empty catalog, no signals and the built-in advice table
    pub fn new(config: &StylistConfig, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        config.validate()?;
        let engine = RetrievalEngine::new(provider, config.retrieval.clone())?;
        let classifier = BodyShapeClassifier::new(&config.classifier)?;
        let advice = AdviceTable::builtin();
        advice.verify_covers(&classifier)?;

        Ok(Self {
            engine,
            signals: RwLock::new(Arc::new(SignalAggregator::default())),
            signal_config: config.signals,
            classifier,
            advice,
        })
    }

    /// Build from configuration, loading every data path it names.
    ///
    /// Persisted embeddings are seeded before the catalog is indexed; an
    /// unreadable artifact is logged and the embeddings are recomputed.
    pub fn open(config: &StylistConfig) -> Result<Self> {
        let provider = config.embedding.build_provider()?;
        let mut stylist = Self::new(config, provider)?;
        let data = &config.data;

        if let Some(path) = &data.advice {
            stylist = stylist.with_advice(AdviceTable::from_csv_path(path)?)?;
        }
        if let Some(events) = &data.events {
            stylist.load_signals_paths(events, data.customers.as_deref())?;
        }
        if let Some(dir) = &data.artifacts_dir {
            let store = ArtifactStore::new(dir)?;
            if store.exists(CATALOG_ARTIFACT) {
                match stylist.load_artifacts(&store) {
                    Ok(seeded) => info!(seeded, "Seeded embedding cache from artifacts"),
                    Err(err) => warn!(error = %err, "Ignoring unreadable artifacts, embeddings will be recomputed"),
                }
            }
        }
        if let Some(path) = &data.catalog {
            stylist.load_catalog(Catalog::from_csv_path(path)?)?;
        }
        Ok(stylist)
    }

    /// Replace the advice table; it must cover every label the classifier emits
    pub fn with_advice(mut self, advice: AdviceTable) -> Result<Self> {
        advice.verify_covers(&self.classifier)?;
        self.advice = advice;
        Ok(self)
    }

    pub fn engine(&self) -> &RetrievalEngine {
        &self.engine
    }

    pub fn classifier(&self) -> &BodyShapeClassifier {
        &self.classifier
    }

    pub fn advice_table(&self) -> &AdviceTable {
        &self.advice
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.engine.snapshot().catalog)
    }

    /// Index `catalog` and serve it; returns the number of indexed products
    pub fn load_catalog(&self, catalog: Catalog) -> Result<usize> {
        let snapshot = self.engine.refresh(catalog)?;
        Ok(snapshot.index.index().len())
    }

    pub fn set_signals(&self, aggregator: SignalAggregator) {
        *self.signals.write() = Arc::new(aggregator);
    }

    pub fn load_signals_paths(&self, events: &Path, customers: Option<&Path>) -> Result<()> {
        let events = BufReader::new(File::open(events).map_err(stylist_catalog::IngestError::from)?);
        let customers = match customers {
            Some(path) => Some(BufReader::new(
                File::open(path).map_err(stylist_catalog::IngestError::from)?,
            )),
            None => None,
        };
        let aggregator = SignalAggregator::from_csv_readers(events, customers, self.signal_config)?;
        info!(
            customers = aggregator.customer_count(),
            quarantined = aggregator.quarantined().len(),
            "Loaded customer signals"
        );
        self.set_signals(aggregator);
        Ok(())
    }

    /// Profile over the loaded signals and the served catalog
    pub fn profile(&self, customer_id: &str) -> CustomerProfile {
        let signals = self.signals.read().clone();
        signals.aggregate(customer_id, &self.engine.snapshot().catalog)
    }

    /// Recommend for `query`, personalised when it names a customer
    pub fn recommend(&self, query: &Query, k: usize) -> std::result::Result<SearchResult, RecommendError> {
        let profile = query.customer_id.as_deref().map(|id| self.profile(id));
        self.engine.recommend(query, profile.as_ref(), k)
    }

    pub fn classify(&self, measurements: &BodyMeasurements) -> Result<Classification> {
        Ok(self.classifier.classify_detailed(measurements)?)
    }

    pub fn advice(&self, shape: ShapeLabel, gender: Gender) -> Result<&AdviceRecord> {
        Ok(self.advice.lookup(shape, gender)?)
    }

    /// Classify, look up the advice and recommend products for its do-list
    pub fn shop_the_look(
        &self,
        measurements: &BodyMeasurements,
        filters: ProductFilter,
        customer_id: Option<&str>,
        k: usize,
    ) -> Result<Look> {
        let classification = self.classify(measurements)?;
        let advice = self.advice(classification.label, classification.gender)?.clone();
        let text = advice.search_query();

        let mut query = Query::text(text.clone())
            .with_gender(classification.gender)
            .with_filters(filters);
        if let Some(id) = customer_id {
            query = query.with_customer(id);
        }
        let products = self.recommend(&query, k)?;

        Ok(Look {
            classification,
            advice,
            query: text,
            products,
        })
    }

    pub fn trending(&self, k: usize, gender: Option<Gender>) -> Vec<Product> {
        self.engine.trending(k, gender)
    }

    pub fn discounted(&self, k: usize, gender: Option<Gender>) -> Vec<Product> {
        self.engine.discounted(k, gender)
    }

    /// Persist the served catalog's embeddings
    pub fn save_artifacts(&self, store: &ArtifactStore) -> std::result::Result<ArtifactDescription, ArtifactError> {
        let artifacts = self.engine.artifacts();
        let description = store.save(CATALOG_ARTIFACT, &artifacts)?;
        info!(
            entries = artifacts.entries.len(),
            checksum = %description.checksum,
            "Saved catalog artifacts"
        );
        Ok(description)
    }

    /// Artifacts present in `store`, by name
    pub fn list_artifacts(&self, store: &ArtifactStore) -> std::result::Result<Vec<ArtifactDescription>, ArtifactError> {
        store.list()
    }

    /// Seed the embedding cache; returns the number of vectors accepted
    pub fn load_artifacts(&self, store: &ArtifactStore) -> std::result::Result<usize, ArtifactError> {
        let artifacts = store.load(CATALOG_ARTIFACT)?;
        Ok(self.engine.seed_cache(&artifacts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StylistError;
    use stylist_body::AdviceError;
    use stylist_catalog::GenderOrientation;
    use stylist_retrieval::{HashEmbedder, ResultSource};

    fn stylist() -> Stylist {
        let stylist = Stylist::new(&StylistConfig::default(), Arc::new(HashEmbedder::new(128))).unwrap();
        let catalog = Catalog::new(vec![
            Product::new("w1", "Wrap Dress", "dresses", 80.0, "wrap dress with tie waist")
                .with_gender(GenderOrientation::Women),
            Product::new("m1", "Structured Blazer", "jackets", 150.0, "structured blazer for men")
                .with_gender(GenderOrientation::Men),
            Product::new("u1", "Silk Scarf", "accessories", 30.0, "printed silk scarf"),
        ])
        .unwrap();
        assert_eq!(stylist.load_catalog(catalog).unwrap(), 3);
        stylist
    }

    #[test]
    fn test_shop_the_look_respects_gender() {
        let stylist = stylist();
        let m = BodyMeasurements::new(Gender::Female, 40.0, 36.0, 28.0, 40.0);
        let look = stylist.shop_the_look(&m, ProductFilter::new(), None, 5).unwrap();

        assert_eq!(look.classification.label, ShapeLabel::Hourglass);
        assert_eq!(look.query, look.advice.search_query());
        assert_eq!(look.products.source, ResultSource::Semantic);
        let mut ids = look.products.ids();
        ids.sort();
        assert_eq!(ids, vec!["u1", "w1"]);
    }

    #[test]
    fn test_shop_the_look_invalid_measurements() {
        let stylist = stylist();
        let m = BodyMeasurements::new(Gender::Male, 40.0, -1.0, 30.0, 40.0);
        assert!(matches!(
            stylist.shop_the_look(&m, ProductFilter::new(), None, 5),
            Err(StylistError::Classify(_))
        ));
    }

    #[test]
    fn test_advice_must_cover_classifier() {
        let stylist = stylist();
        let partial = AdviceTable::from_records(AdviceTable::builtin().records().take(3).cloned());
        assert!(matches!(
            stylist.with_advice(partial),
            Err(StylistError::Advice(AdviceError::Coverage(_)))
        ));
    }

    #[test]
    fn test_unknown_customer_profile_is_empty() {
        let stylist = stylist();
        let profile = stylist.profile("nobody");
        assert_eq!(profile.customer_id, "nobody");
        assert!(!profile.has_history());
    }
}
