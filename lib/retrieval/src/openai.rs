//! OpenAI-compatible embeddings client.
//!
//! Each call is a single attempt with a client timeout; wrap it in
//! [`crate::RetryingEmbedder`] for bounded retries.

use crate::{EmbedError, EmbeddingProvider};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stylist_core::Vector;

/// Blocking embeddings client for `POST {base_url}/embeddings`
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dim: usize,
    /// Sent as `dimensions` so the service truncates to `dim`
    request_dimensions: bool,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dim", &self.dim)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dim: usize,
        request_dimensions: bool,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        if api_key.trim().is_empty() {
            return Err(EmbedError::Config("missing API key".to_string()));
        }
        if model.trim().is_empty() {
            return Err(EmbedError::Config("missing model name".to_string()));
        }
        if dim == 0 {
            return Err(EmbedError::Config("dimension must be positive".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| EmbedError::Config("API key is not a valid header value".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| EmbedError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dim,
            request_dimensions,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transport_error(err: reqwest::Error) -> EmbedError {
    EmbedError::Transport {
        retryable: err.is_timeout() || err.is_connect() || err.is_request() || err.is_body(),
        message: err.to_string(),
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vector, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyText);
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: [text],
            dimensions: self.request_dimensions.then_some(self.dim),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| EmbedError::Decode(e.to_string()))?;
        let data = parsed
            .data
            .into_iter()
            .min_by_key(|entry| entry.index)
            .ok_or_else(|| EmbedError::Decode("response contained no embeddings".to_string()))?;

        if data.embedding.len() != self.dim {
            return Err(EmbedError::Dimension {
                expected: self.dim,
                actual: data.embedding.len(),
            });
        }
        let mut vector = Vector::new(data.embedding);
        if !vector.normalize() {
            return Err(EmbedError::Decode("zero or non-finite embedding".to_string()));
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
