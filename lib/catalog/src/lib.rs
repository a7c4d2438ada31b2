//! Catalog and customer data for stylist.
//!
//! - [`Catalog`]: validated, id-ordered product store with trending and
//!   discount listings
//! - [`ingest`]: CSV readers that quarantine malformed rows
//! - [`SignalAggregator`]: replays customer events into a [`CustomerProfile`]
//! - [`ArtifactStore`]: checksummed embedding snapshots on disk

pub mod artifacts;
pub mod catalog;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod product;
pub mod signals;

pub use artifacts::{text_digest, ArtifactDescription, ArtifactEntry, ArtifactStore, EmbeddingArtifacts};
pub use catalog::Catalog;
pub use error::{ArtifactError, IngestError};
pub use filter::{Filter, ProductFilter};
pub use ingest::{IngestReport, QuarantinedRow};
pub use product::{has_words, GenderOrientation, Product};
pub use signals::{
    CustomerEvent, CustomerProfile, CustomerRecord, Demographics, EventKind, Purchase, SignalAggregator,
    SignalConfig,
};
