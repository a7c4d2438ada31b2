use crate::config::ConfigError;
use stylist_body::{AdviceError, ClassifyError, TableError};
use stylist_catalog::{ArtifactError, IngestError};
use stylist_retrieval::{BuildError, EmbedError, RecommendError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StylistError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid classifier table: {0}")]
    Table(#[from] TableError),

    #[error(transparent)]
    Advice(#[from] AdviceError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Recommend(#[from] RecommendError),

    #[error("Index build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Embed(#[from] EmbedError),
}

impl From<stylist_retrieval::ConfigError> for StylistError {
    fn from(err: stylist_retrieval::ConfigError) -> Self {
        StylistError::Config(ConfigError::Invalid(err.0))
    }
}

pub type Result<T> = std::result::Result<T, StylistError>;
