// Embeddings keyed by the digest of the text they were computed from
use crate::{EmbedError, EmbeddingProvider};
use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use stylist_catalog::{text_digest, EmbeddingArtifacts};
use stylist_core::Vector;
use tracing::{debug, warn};

/// Thread-safe embedding cache.
///
/// Each distinct text is embedded once per model. Entries can be seeded from
/// persisted artifacts so a restart does not call the provider again.
#[derive(Debug)]
pub struct EmbeddingCache {
    model: String,
    dim: usize,
    entries: RwLock<AHashMap<String, Vector>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    pub fn new(model: impl Into<String>, dim: usize) -> Self {
        Self {
            model: model.into(),
            dim,
            entries: RwLock::new(AHashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn for_provider(provider: &dyn EmbeddingProvider) -> Self {
        Self::new(provider.model_name(), provider.dimension())
    }

    pub fn get(&self, digest: &str) -> Option<Vector> {
        self.entries.read().get(digest).cloned()
    }

    /// Return the cached vector for `text` or embed and remember it
    pub fn get_or_embed(&self, text: &str, provider: &dyn EmbeddingProvider) -> Result<(String, Vector), EmbedError> {
        let digest = text_digest(text);
        if let Some(vector) = self.get(&digest) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((digest, vector));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let vector = provider.embed(text)?;
        if vector.dim() != self.dim {
            return Err(EmbedError::Dimension {
                expected: self.dim,
                actual: vector.dim(),
            });
        }
        self.entries.write().insert(digest.clone(), vector.clone());
        Ok((digest, vector))
    }

    /// Load vectors from artifacts built with the same model and dimension.
    /// Returns how many entries were added.
    pub fn seed(&self, artifacts: &EmbeddingArtifacts) -> usize {
        if artifacts.model != self.model || artifacts.dim != self.dim {
            warn!(
                artifact_model = %artifacts.model,
                artifact_dim = artifacts.dim,
                model = %self.model,
                dim = self.dim,
                "Ignoring embedding artifacts from a different model"
            );
            return 0;
        }

        let mut entries = self.entries.write();
        let mut added = 0;
        for entry in &artifacts.entries {
            if entry.vector.len() != self.dim {
                continue;
            }
            if let Some(vector) = Vector::from_slice(&entry.vector).normalized() {
                if entries.insert(entry.text_hash.clone(), vector).is_none() {
                    added += 1;
                }
            }
        }
        debug!(added, "Seeded embedding cache");
        added
    }

    /// Drop every entry whose digest is not in `live`; returns how many went
    pub fn retain(&self, live: &AHashSet<String>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|digest, _| live.contains(digest));
        before - entries.len()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}
