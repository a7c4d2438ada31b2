//! Embedding provider boundary
//!
//! [`EmbeddingProvider`] is the only seam between the engine and whatever
//! turns text into vectors. [`HashEmbedder`] is a local, deterministic
//! provider; [`RetryingEmbedder`] wraps any provider with bounded retries.

use crate::EmbedError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use stylist_core::Vector;
use tracing::warn;

/// Text to fixed-length vector. Implementations must be safe to call from
/// several threads at once.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vector, EmbedError>;

    /// Length of every vector this provider returns
    fn dimension(&self) -> usize;

    /// Identifies the model; artifacts from another model are not reused
    fn model_name(&self) -> &str;
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<P> {
    fn embed(&self, text: &str) -> Result<Vector, EmbedError> {
        (**self).embed(text)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<P> {
    fn embed(&self, text: &str) -> Result<Vector, EmbedError> {
        (**self).embed(text)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Offline embedder hashing character trigrams and words into `dim` buckets.
///
/// Uses FNV-1a so vectors are identical across runs and platforms, which
/// keeps persisted artifacts valid.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    model: String,
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            model: format!("hash-trigram-{dim}"),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        (fnv1a(token.as_bytes()) % self.dim as u64) as usize
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vector, EmbedError> {
        if self.dim == 0 {
            return Err(EmbedError::Config("dimension must be positive".to_string()));
        }
        let normalized = text.to_lowercase();
        let words: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Err(EmbedError::EmptyText);
        }

        let mut data = vec![0.0f32; self.dim];
        for word in &words {
            // words weigh more than their trigrams
            data[self.bucket(word)] += 2.0;

            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                data[self.bucket(&trigram)] += 1.0;
            }
        }

        let mut vector = Vector::new(data);
        vector.normalize();
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Retries retryable failures with exponential backoff: `base * 2^attempt`,
/// the exponent capped at 5.
#[derive(Debug, Clone)]
pub struct RetryingEmbedder<P> {
    inner: P,
    max_attempts: usize,
    base_backoff: Duration,
}

impl<P: EmbeddingProvider> RetryingEmbedder<P> {
    pub fn new(inner: P, max_attempts: usize, base_backoff: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        self.base_backoff * (1u32 << capped)
    }
}

impl<P: EmbeddingProvider> EmbeddingProvider for RetryingEmbedder<P> {
    fn embed(&self, text: &str) -> Result<Vector, EmbedError> {
        let mut attempt = 0usize;
        loop {
            match self.inner.embed(text) {
                Ok(vector) => return Ok(vector),
                Err(err) if err.is_retryable() && attempt + 1 < self.max_attempts => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(attempt, ?delay, error = %err, "Retrying embedding request");
                    thread::sleep(delay);
                }
                Err(err) if err.is_retryable() => {
                    return Err(EmbedError::Exhausted {
                        attempts: attempt + 1,
                        last: Box::new(err),
                    })
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls with a retryable error, then
    /// delegates to a hash embedder
    pub struct FlakyEmbedder {
        pub inner: HashEmbedder,
        pub failures: usize,
        pub calls: AtomicUsize,
    }

    impl FlakyEmbedder {
        pub fn new(dim: usize, failures: usize) -> Self {
            Self {
                inner: HashEmbedder::new(dim),
                failures,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EmbeddingProvider for FlakyEmbedder {
        fn embed(&self, text: &str) -> Result<Vector, EmbedError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(EmbedError::Status {
                    status: 503,
                    body: "overloaded".to_string(),
                });
            }
            self.inner.embed(text)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FlakyEmbedder;
    use super::*;

    #[test]
    fn test_hash_embedder_deterministic() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("Comfortable running shoes").unwrap();
        let b = embedder.embed("comfortable running shoes").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dim(), 64);
        assert!((a.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embedder_similarity() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed("comfortable shoes").unwrap();
        let shoe = embedder.embed("comfortable leather shoes for walking").unwrap();
        let shirt = embedder.embed("slim fit cotton shirt").unwrap();
        assert!(query.dot(&shoe) > query.dot(&shirt));
    }

    #[test]
    fn test_hash_embedder_blank() {
        let embedder = HashEmbedder::new(16);
        assert_eq!(embedder.embed("  ,. "), Err(EmbedError::EmptyText));
    }

    #[test]
    fn test_retry_recovers() {
        let retrying = RetryingEmbedder::new(FlakyEmbedder::new(16, 2), 3, Duration::ZERO);
        assert!(retrying.embed("linen trousers").is_ok());
        assert_eq!(retrying.inner().calls(), 3);
    }

    #[test]
    fn test_retry_bounded() {
        let retrying = RetryingEmbedder::new(FlakyEmbedder::new(16, 10), 3, Duration::ZERO);
        let err = retrying.embed("linen trousers").unwrap_err();
        assert!(matches!(err, EmbedError::Exhausted { attempts: 3, .. }));
        assert_eq!(retrying.inner().calls(), 3);
    }

    #[test]
    fn test_non_retryable_not_retried() {
        let retrying = RetryingEmbedder::new(HashEmbedder::new(16), 5, Duration::ZERO);
        assert_eq!(retrying.embed(""), Err(EmbedError::EmptyText));
    }

    #[test]
    fn test_backoff_capped() {
        let retrying = RetryingEmbedder::new(HashEmbedder::new(4), 10, Duration::from_millis(500));
        assert_eq!(retrying.backoff(1), Duration::from_millis(1000));
        assert_eq!(retrying.backoff(9), Duration::from_millis(16000));
    }
}
