//! # stylist core
//!
//! Vector primitives and nearest-neighbour search for the stylist
//! recommendation engine.
//!
//! - [`Vector`] - dense embedding with SIMD dot product and normalization
//! - [`VectorIndex`] - immutable cosine-similarity index, flat or HNSW
//! - [`Gender`] - shared by measurements, query hints and catalog filters
//!
//! ## Example
//!
//! ```rust
//! use stylist_core::{IndexConfig, IndexEntry, Vector, VectorIndex};
//!
//! let entries = vec![
//!     IndexEntry::new("p1", Vector::new(vec![1.0, 0.0, 0.0])),
//!     IndexEntry::new("p2", Vector::new(vec![0.0, 1.0, 0.0])),
//! ];
//! let index = VectorIndex::build(entries, IndexConfig::default()).unwrap();
//!
//! let hits = index.search(&Vector::new(vec![0.9, 0.1, 0.0]), 1).unwrap();
//! assert_eq!(hits[0].id, "p1");
//! ```

pub mod error;
pub mod gender;
pub mod hnsw;
pub mod index;
pub mod vector;

/// SIMD-accelerated dot product and norm (AVX2/FMA on x86_64, NEON on ARM64)
pub mod simd;

pub use error::{Error, Result};
pub use gender::Gender;
pub use hnsw::HnswParams;
pub use index::{IndexConfig, IndexEntry, IndexKind, SearchHit, VectorIndex};
pub use vector::Vector;
