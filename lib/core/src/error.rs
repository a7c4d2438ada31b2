use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid vector dimension for '{id}': expected {expected}, got {actual}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Vector for '{0}' is empty, non-finite or has zero norm")]
    EmptyVector(String),

    #[error("Duplicate entry id: {0}")]
    DuplicateId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
