//! Boost re-ranking of vector search candidates
//!
//! Adds side-channel signals (customer affinity, wishlist, cart, discount,
//! trending) on top of the cosine similarity and re-sorts.

use crate::BoostWeights;
use ahash::AHashSet;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use stylist_catalog::{CustomerProfile, Product};

/// One ranked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    pub product_id: String,
    /// Cosine similarity from the index, 0.0 for popularity results
    pub similarity: f32,
    pub boost: f32,
    /// `similarity + boost`, or the popularity score
    pub score: f32,
}

/// Sort by score descending, ties by id ascending
pub fn sort_scored(items: &mut [ScoredProduct]) {
    items.sort_by(|a, b| {
        Reverse(OrderedFloat(a.score))
            .cmp(&Reverse(OrderedFloat(b.score)))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
}

#[derive(Debug, Clone)]
pub struct Reranker {
    weights: BoostWeights,
}

impl Reranker {
    pub fn new(weights: BoostWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &BoostWeights {
        &self.weights
    }

    /// Total additive boost for one product
    pub fn boost(&self, product: &Product, profile: Option<&CustomerProfile>, trending: &AHashSet<String>) -> f32 {
        let w = &self.weights;
        let mut boost = 0.0f32;

        let sensitivity = profile.and_then(|p| p.price_sensitivity).unwrap_or(0.0) as f32;
        boost += w.discount * product.discount_fraction() as f32 * (1.0 + sensitivity);

        if trending.contains(&product.id) {
            boost += w.trending;
        }

        if let Some(profile) = profile {
            if profile.prefers_category(&product.category) {
                boost += w.category_affinity;
            }
            if profile.is_wishlisted(&product.id) {
                boost += w.wishlist;
            }
            if profile.in_abandoned_cart(&product.id) {
                boost += w.abandoned_cart;
            }
        }
        boost
    }

    /// Apply boosts to (product, similarity) candidates, re-sort and keep `k`
    pub fn rerank(
        &self,
        candidates: Vec<(&Product, f32)>,
        profile: Option<&CustomerProfile>,
        trending: &AHashSet<String>,
        k: usize,
    ) -> Vec<ScoredProduct> {
        let mut scored: Vec<ScoredProduct> = candidates
            .into_iter()
            .map(|(product, similarity)| {
                let boost = self.boost(product, profile, trending);
                ScoredProduct {
                    product_id: product.id.clone(),
                    similarity,
                    boost,
                    score: similarity + boost,
                }
            })
            .collect();
        sort_scored(&mut scored);
        scored.truncate(k);
        scored
    }
}
