//! Generic text-embedding index over any entity collection.
//!
//! Any entity collection goes through the same build and search path; only
//! [`Embeddable`] differs.

use crate::{BuildError, EmbedError, EmbeddingCache, EmbeddingProvider};
use ahash::AHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stylist_catalog::{has_words, ArtifactEntry, Product};
use stylist_core::{IndexConfig, IndexEntry, SearchHit, Vector, VectorIndex};
use tracing::{info, warn};

/// Which product fields make up the embedding text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedText {
    Description,
    #[default]
    NameAndDescription,
}

pub trait Embeddable {
    fn embed_id(&self) -> &str;

    /// Text to embed, `None` when the entity has nothing to say
    fn embed_text(&self, source: EmbedText) -> Option<String>;
}

impl Embeddable for Product {
    fn embed_id(&self) -> &str {
        &self.id
    }

    fn embed_text(&self, source: EmbedText) -> Option<String> {
        let text = match source {
            EmbedText::Description => self.description.trim().to_string(),
            EmbedText::NameAndDescription => {
                format!("{} {}", self.name.trim(), self.description.trim())
                    .trim()
                    .to_string()
            }
        };
        has_words(&text).then_some(text)
    }
}

/// Embeds each entity once (through the cache) in parallel.
/// Entities without text, or whose text the provider finds empty, are skipped.
pub fn embed_all<T>(
    items: &[T],
    source: EmbedText,
    provider: &dyn EmbeddingProvider,
    cache: &EmbeddingCache,
) -> Result<Vec<ArtifactEntry>, BuildError>
where
    T: Embeddable + Sync,
{
    items
        .par_iter()
        .filter_map(|item| item.embed_text(source).map(|text| (item.embed_id(), text)))
        .filter_map(|(id, text)| match cache.get_or_embed(&text, provider) {
            Ok((text_hash, vector)) => Some(Ok(ArtifactEntry {
                id: id.to_string(),
                text_hash,
                vector: vector.into_inner(),
            })),
            Err(EmbedError::EmptyText) => {
                warn!(id, "Skipping entity with nothing to embed");
                None
            }
            Err(source) => Some(Err(BuildError::Embedding {
                id: id.to_string(),
                source,
            })),
        })
        .collect()
}

/// Vector index plus the entities it was built from
#[derive(Debug, Clone)]
pub struct SemanticIndex<T> {
    index: VectorIndex,
    items: Vec<T>,
    positions: AHashMap<String, usize>,
    entries: Vec<ArtifactEntry>,
}

impl<T: Embeddable + Clone + Sync> SemanticIndex<T> {
    pub fn empty(config: IndexConfig) -> Self {
        Self {
            index: VectorIndex::empty(config),
            items: Vec::new(),
            positions: AHashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn build(
        items: &[T],
        source: EmbedText,
        provider: &dyn EmbeddingProvider,
        cache: &EmbeddingCache,
        config: IndexConfig,
    ) -> Result<Self, BuildError> {
        let entries = embed_all(items, source, provider, cache)?;
        let index_entries = entries
            .iter()
            .map(|e| IndexEntry::new(e.id.clone(), Vector::from_slice(&e.vector)))
            .collect();
        let index = VectorIndex::build(index_entries, config)?;

        let positions = items
            .iter()
            .enumerate()
            .map(|(pos, item)| (item.embed_id().to_string(), pos))
            .collect();

        info!(items = items.len(), indexed = index.len(), "Built semantic index");
        Ok(Self {
            index,
            items: items.to_vec(),
            positions,
            entries,
        })
    }

    pub fn search(&self, query: &Vector, k: usize) -> stylist_core::Result<Vec<SearchHit>> {
        self.index.search(query, k)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.positions.get(id).map(|&pos| &self.items[pos])
    }

    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        self.index.vector(id)
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// (id, text hash, vector) per indexed entity, for persistence
    pub fn entries(&self) -> &[ArtifactEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashEmbedder;
    use stylist_catalog::CustomerProfile;
    use stylist_core::IndexKind;

    impl Embeddable for CustomerProfile {
        fn embed_id(&self) -> &str {
            &self.customer_id
        }

        /// Recent queries followed by preferred categories
        fn embed_text(&self, _source: EmbedText) -> Option<String> {
            let parts: Vec<&str> = self
                .recent_queries
                .iter()
                .map(String::as_str)
                .chain(self.category_affinity.keys().map(String::as_str))
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
    }

    fn search_text<'a, T: Embeddable + Clone + Sync>(
        index: &'a SemanticIndex<T>,
        text: &str,
        k: usize,
        provider: &dyn EmbeddingProvider,
    ) -> Vec<(&'a T, f32)> {
        let query = provider.embed(text).unwrap();
        index
            .search(&query, k)
            .unwrap()
            .into_iter()
            .filter_map(|hit| index.get(&hit.id).map(|item| (item, hit.score)))
            .collect()
    }

    fn products() -> Vec<Product> {
        vec![
            Product::new("a", "Trail Runner", "shoes", 90.0, "comfortable running shoes"),
            Product::new("b", "Oxford", "shirts", 40.0, "crisp cotton oxford shirt"),
            Product::new("c", "Loafer", "shoes", 70.0, "leather loafer shoes"),
        ]
    }

    #[test]
    fn test_embed_text_sources() {
        let p = &products()[0];
        assert_eq!(p.embed_text(EmbedText::Description).unwrap(), "comfortable running shoes");
        assert_eq!(
            p.embed_text(EmbedText::NameAndDescription).unwrap(),
            "Trail Runner comfortable running shoes"
        );
    }

    #[test]
    fn test_build_and_search_text() {
        let provider = HashEmbedder::new(128);
        let cache = EmbeddingCache::for_provider(&provider);
        let index = SemanticIndex::build(
            &products(),
            EmbedText::Description,
            &provider,
            &cache,
            IndexConfig::default(),
        )
        .unwrap();

        assert_eq!(index.index().len(), 3);
        assert_eq!(index.entries().len(), 3);
        let hits = search_text(&index, "cotton shirt", 1, &provider);
        assert_eq!(hits[0].0.id, "b");
    }

    /// Refuses any text mentioning "blank"
    struct Picky(HashEmbedder);

    impl EmbeddingProvider for Picky {
        fn embed(&self, text: &str) -> Result<Vector, EmbedError> {
            if text.contains("blank") {
                return Err(EmbedError::EmptyText);
            }
            self.0.embed(text)
        }

        fn dimension(&self) -> usize {
            self.0.dimension()
        }

        fn model_name(&self) -> &str {
            self.0.model_name()
        }
    }

    #[test]
    fn test_unembeddable_items_skipped() {
        let mut items = products();
        items.push(Product::new("d", "***", "shirts", 10.0, "---"));
        items.push(Product::new("e", "Tee", "shirts", 10.0, "blank tee"));

        let provider = Picky(HashEmbedder::new(64));
        let cache = EmbeddingCache::for_provider(&provider);
        let index = SemanticIndex::build(&items, EmbedText::NameAndDescription, &provider, &cache, IndexConfig::default())
            .unwrap();

        assert_eq!(index.index().len(), 3);
        assert!(index.vector("d").is_none());
        assert!(index.vector("e").is_none());
        assert_eq!(items[3].embed_text(EmbedText::NameAndDescription), None);
    }

    #[test]
    fn test_rebuild_same_order() {
        let provider = HashEmbedder::new(64);
        let cache = EmbeddingCache::for_provider(&provider);
        let config = IndexConfig {
            kind: IndexKind::Hnsw,
            ..IndexConfig::default()
        };
        let first = SemanticIndex::build(&products(), EmbedText::Description, &provider, &cache, config).unwrap();
        let second = SemanticIndex::build(&products(), EmbedText::Description, &provider, &cache, config).unwrap();

        let query = provider.embed("shoes").unwrap();
        assert_eq!(first.search(&query, 3).unwrap(), second.search(&query, 3).unwrap());
    }

    #[test]
    fn test_customer_profiles_share_path() {
        let mut shopper = CustomerProfile::empty("c1");
        shopper.recent_queries = vec!["summer linen dress".to_string()];
        let mut other = CustomerProfile::empty("c2");
        other.recent_queries = vec!["winter boots".to_string()];
        let silent = CustomerProfile::empty("c3");

        let provider = HashEmbedder::new(128);
        let cache = EmbeddingCache::for_provider(&provider);
        let index = SemanticIndex::build(
            &[shopper, other, silent],
            EmbedText::default(),
            &provider,
            &cache,
            IndexConfig::default(),
        )
        .unwrap();

        // profiles without text are not indexed
        assert_eq!(index.index().len(), 2);
        let hits = search_text(&index, "linen dress", 1, &provider);
        assert_eq!(hits[0].0.customer_id, "c1");
    }
}
