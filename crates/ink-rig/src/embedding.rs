//! Embedding providers.
//!
//! Text goes through rig's OpenAI-compatible embedding models. Image
//! embeddings have no rig surface, so they go through a reqwest client
//! posting image URLs to an OpenAI-compatible `/embeddings` endpoint
//! backed by a multimodal model (CLIP-style deployments).

use std::sync::Arc;

use async_trait::async_trait;
use ink_core::emb::{self, Embedding, ErrorKind, ImageEmbedder, TextEmbedder};
use ink_core::ServiceHealth;
use rig::embeddings::EmbeddingModel as RigEmbeddingModel;
use rig::prelude::EmbeddingsClient;
use rig::providers::openai;
use serde::Deserialize;

use crate::{EmbeddingConfig, TRACING_TARGET};

/// Text embedder over a rig OpenAI-compatible embedding model.
///
/// Cheaply cloneable wrapper around an `Arc` of the model handle.
#[derive(Clone)]
pub struct RigTextEmbedder {
    inner: Arc<RigTextEmbedderInner>,
}

struct RigTextEmbedderInner {
    model: openai::EmbeddingModel,
    model_name: String,
    dimensions: usize,
}

impl RigTextEmbedder {
    /// Creates a text embedder from configuration.
    pub fn new(config: &EmbeddingConfig) -> emb::Result<Self> {
        let client = match &config.endpoint {
            Some(endpoint) => openai::Client::builder()
                .api_key(&config.api_key)
                .base_url(endpoint)
                .build(),
            None => openai::Client::new(&config.api_key),
        }
        .map_err(|e| {
            emb::Error::new(ErrorKind::InternalError)
                .with_message(format!("openai client: {e}"))
        })?;

        let model = client.embedding_model_with_ndims(&config.model, config.dimension);

        tracing::info!(
            target: TRACING_TARGET,
            model = %config.model,
            ndims = config.dimension,
            "Text embedder initialized"
        );

        Ok(Self {
            inner: Arc::new(RigTextEmbedderInner {
                model,
                model_name: config.model.clone(),
                dimensions: config.dimension,
            }),
        })
    }
}

#[async_trait]
impl TextEmbedder for RigTextEmbedder {
    async fn embed_texts(&self, inputs: &[String]) -> emb::Result<Vec<Embedding>> {
        if inputs.is_empty() {
            return Ok(vec![]);
        }

        let embeddings = self
            .inner
            .model
            .embed_texts(inputs.to_vec())
            .await
            .map_err(|e| classify_message(&e.to_string()))?;

        embeddings
            .into_iter()
            .map(|embedding| {
                let values: Vec<f32> = embedding.vec.iter().map(|&v| v as f32).collect();
                if values.len() != self.inner.dimensions {
                    return Err(emb::Error::dimension_mismatch(
                        self.inner.dimensions,
                        values.len(),
                    ));
                }
                Ok(Embedding::new(values).normalized())
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    fn model_name(&self) -> &str {
        &self.inner.model_name
    }

    async fn health_check(&self) -> emb::Result<ServiceHealth> {
        let start = std::time::Instant::now();
        match self.embed_texts(&["ping".to_owned()]).await {
            Ok(_) => Ok(ServiceHealth::healthy().with_response_time(start.elapsed())),
            Err(e) => Ok(ServiceHealth::unhealthy(e.to_string())),
        }
    }
}

impl std::fmt::Debug for RigTextEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigTextEmbedder")
            .field("model", &self.inner.model_name)
            .field("ndims", &self.inner.dimensions)
            .finish()
    }
}

/// Image embedder over an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct HttpImageEmbedder {
    inner: Arc<HttpImageEmbedderInner>,
}

struct HttpImageEmbedderInner {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_name: String,
    dimensions: usize,
}

/// Default endpoint used when the configuration leaves it unset.
const DEFAULT_EMBEDDINGS_ENDPOINT: &str = "https://api.openai.com/v1";

#[derive(Debug, serde::Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl HttpImageEmbedder {
    /// Creates an image embedder from configuration.
    pub fn new(config: &EmbeddingConfig) -> emb::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                emb::Error::new(ErrorKind::InternalError)
                    .with_message(format!("http client: {e}"))
            })?;

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_EMBEDDINGS_ENDPOINT.to_owned());

        tracing::info!(
            target: TRACING_TARGET,
            model = %config.model,
            endpoint = %endpoint,
            "Image embedder initialized"
        );

        Ok(Self {
            inner: Arc::new(HttpImageEmbedderInner {
                http,
                endpoint: endpoint.trim_end_matches('/').to_owned(),
                api_key: config.api_key.clone(),
                model_name: config.model.clone(),
                dimensions: config.dimension,
            }),
        })
    }
}

#[async_trait]
impl ImageEmbedder for HttpImageEmbedder {
    async fn embed_images(&self, urls: &[String]) -> emb::Result<Vec<Embedding>> {
        if urls.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbeddingsRequest {
            model: &self.inner.model_name,
            input: urls,
            dimensions: self.inner.dimensions,
        };

        let response = self
            .inner
            .http
            .post(format!("{}/embeddings", self.inner.endpoint))
            .bearer_auth(&self.inner.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: EmbeddingsResponse = response.json().await.map_err(classify_reqwest)?;

        if parsed.data.len() != urls.len() {
            return Err(emb::Error::internal_error().with_message(format!(
                "endpoint returned {} embeddings for {} inputs",
                parsed.data.len(),
                urls.len()
            )));
        }

        parsed
            .data
            .into_iter()
            .map(|datum| {
                if datum.embedding.len() != self.inner.dimensions {
                    return Err(emb::Error::dimension_mismatch(
                        self.inner.dimensions,
                        datum.embedding.len(),
                    ));
                }
                Ok(Embedding::new(datum.embedding).normalized())
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    fn model_name(&self) -> &str {
        &self.inner.model_name
    }

    async fn health_check(&self) -> emb::Result<ServiceHealth> {
        // a HEAD-ish probe against the endpoint root is enough to tell
        // connectivity apart from model problems
        let start = std::time::Instant::now();
        match self
            .inner
            .http
            .get(&self.inner.endpoint)
            .bearer_auth(&self.inner.api_key)
            .send()
            .await
        {
            Ok(_) => Ok(ServiceHealth::healthy().with_response_time(start.elapsed())),
            Err(e) => Ok(ServiceHealth::unhealthy(e.to_string())),
        }
    }
}

impl std::fmt::Debug for HttpImageEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpImageEmbedder")
            .field("model", &self.inner.model_name)
            .field("endpoint", &self.inner.endpoint)
            .field("ndims", &self.inner.dimensions)
            .finish()
    }
}

fn classify_reqwest(error: reqwest::Error) -> emb::Error {
    let kind = if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_connect() {
        ErrorKind::NetworkError
    } else if error.is_decode() {
        ErrorKind::InternalError
    } else {
        ErrorKind::NetworkError
    };
    emb::Error::new(kind)
        .with_message(error.to_string())
        .with_source(Box::new(error))
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> emb::Error {
    let kind = match status.as_u16() {
        401 | 403 => ErrorKind::Authentication,
        415 | 422 => ErrorKind::UnsupportedFormat,
        400 => ErrorKind::InvalidInput,
        429 => ErrorKind::RateLimited,
        500..=599 => ErrorKind::ServiceUnavailable,
        _ => ErrorKind::InternalError,
    };
    emb::Error::new(kind).with_message(format!("{status}: {body}"))
}

fn classify_message(message: &str) -> emb::Error {
    let lowered = message.to_ascii_lowercase();
    let kind = if lowered.contains("401") || lowered.contains("unauthorized") {
        ErrorKind::Authentication
    } else if lowered.contains("429") || lowered.contains("rate limit") {
        ErrorKind::RateLimited
    } else if lowered.contains("timeout") || lowered.contains("timed out") {
        ErrorKind::Timeout
    } else if lowered.contains("400") || lowered.contains("invalid") {
        ErrorKind::InvalidInput
    } else {
        ErrorKind::ServiceUnavailable
    };
    emb::Error::new(kind).with_message(message.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            classify_status(reqwest::StatusCode::UNAUTHORIZED, "").kind,
            ErrorKind::Authentication
        );
        assert_eq!(
            classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "").kind,
            ErrorKind::RateLimited
        );
        assert_eq!(
            classify_status(reqwest::StatusCode::BAD_GATEWAY, "").kind,
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(
            classify_status(reqwest::StatusCode::UNPROCESSABLE_ENTITY, "").kind,
            ErrorKind::UnsupportedFormat
        );
    }

    #[test]
    fn message_classification() {
        assert_eq!(classify_message("401 Unauthorized").kind, ErrorKind::Authentication);
        assert_eq!(classify_message("rate limit exceeded").kind, ErrorKind::RateLimited);
        assert_eq!(classify_message("connection timed out").kind, ErrorKind::Timeout);
        assert_eq!(classify_message("boom").kind, ErrorKind::ServiceUnavailable);
    }
}
