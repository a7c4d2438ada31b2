//! # stylist
//!
//! Retrieval-augmented fashion recommendation: a product catalog and a
//! customer's history in, ranked products out; body measurements in, a
//! shape label and style advice out.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! stylist --catalog data/products.csv recommend --query "linen summer shirt" -k 5
//! stylist classify --gender female --shoulder 40 --bust 36 --waist 28 --hips 40
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use std::sync::Arc;
//! use stylist::prelude::*;
//!
//! let stylist = Stylist::new(&StylistConfig::default(), Arc::new(HashEmbedder::new(64))).unwrap();
//! stylist
//!     .load_catalog(Catalog::new(vec![Product::new("p1", "Wrap Dress", "dresses", 80.0, "wrap dress")]).unwrap())
//!     .unwrap();
//!
//! let result = stylist.recommend(&Query::text("wrap dress"), 3).unwrap();
//! assert_eq!(result.ids(), vec!["p1"]);
//!
//! let m = BodyMeasurements::new(Gender::Female, 40.0, 36.0, 28.0, 40.0);
//! assert_eq!(stylist.classify(&m).unwrap().label, ShapeLabel::Hourglass);
//! ```
//!
//! ## Crate Structure
//!
//! - `stylist-core` - vectors, SIMD kernels, flat and HNSW indexes
//! - `stylist-catalog` - products, CSV ingestion, customer signals, artifacts
//! - `stylist-retrieval` - embedding providers, semantic index, retrieval engine
//! - `stylist-body` - body shape classifier and advice table

pub mod config;
pub mod error;
pub mod stylist;

pub use config::{ConfigError, DataPaths, StylistConfig};
pub use error::{Result, StylistError};
pub use stylist::{Look, Stylist, CATALOG_ARTIFACT};

// Re-export member crates
pub use stylist_body as body;
pub use stylist_catalog as catalog;
pub use stylist_retrieval as retrieval;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Look, Stylist, StylistConfig, StylistError};
    pub use stylist_body::{AdviceRecord, AdviceTable, BodyMeasurements, BodyShapeClassifier, ShapeLabel};
    pub use stylist_catalog::{ArtifactStore, Catalog, CustomerProfile, Product, ProductFilter, SignalAggregator};
    pub use stylist_core::Gender;
    pub use stylist_retrieval::{
        EmbeddingProvider, HashEmbedder, Query, RecommendError, ResultSource, RetrievalEngine, SearchResult,
    };
}
