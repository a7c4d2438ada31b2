use thiserror::Error;

/// Failure of a single embedding request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedError {
    #[error("Cannot embed blank text")]
    EmptyText,

    #[error("Embedding request failed: {message}")]
    Transport { message: String, retryable: bool },

    #[error("Embedding provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed embedding response: {0}")]
    Decode(String),

    #[error("Embedding has dimension {actual}, expected {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("Embedding provider misconfigured: {0}")]
    Config(String),

    #[error("Embedding unavailable after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: Box<EmbedError> },
}

impl EmbedError {
    /// Timeouts, connection failures, 429 and 5xx are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbedError::Transport { retryable, .. } => *retryable,
            EmbedError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

/// Failure building an index snapshot. The served snapshot is left as is.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to embed '{id}': {source}")]
    Embedding {
        id: String,
        #[source]
        source: EmbedError,
    },

    #[error(transparent)]
    Index(#[from] stylist_core::Error),
}

#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("k must be at least 1")]
    InvalidK,

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(#[source] EmbedError),

    #[error(transparent)]
    Index(#[from] stylist_core::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid retrieval configuration: {0}")]
pub struct ConfigError(pub String);
