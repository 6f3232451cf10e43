//! Embedding service port.
//!
//! Producers of fixed-dimension float vectors used for semantic retrieval.
//! Text and image inputs go through separate traits because implementations
//! frequently back them with different models, but both produce the same
//! [`Embedding`] representation at the deployment dimension.
//!
//! Implementations should return unit-norm vectors; callers renormalise
//! defensively via [`Embedding::normalized`] before persisting.

mod embedding;
mod error;

pub use embedding::{Embedding, cosine_similarity};
pub use error::{Error, ErrorKind, Result};

use async_trait::async_trait;

use crate::ServiceHealth;

/// Tracing target for embedding operations.
pub const TRACING_TARGET: &str = "ink_core::emb";

/// Produces embeddings for text inputs.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embeds a batch of texts, returning one vector per input in order.
    async fn embed_texts(&self, inputs: &[String]) -> Result<Vec<Embedding>>;

    /// The vector dimension this embedder produces.
    fn dimensions(&self) -> usize;

    /// Identifier of the producing model.
    fn model_name(&self) -> &str;

    /// Checks whether the backing service is reachable.
    async fn health_check(&self) -> Result<ServiceHealth>;

    /// Embeds a single text input.
    async fn embed_text(&self, input: &str) -> Result<Embedding> {
        let inputs = [input.to_owned()];
        let mut embeddings = self.embed_texts(&inputs).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::new(ErrorKind::InternalError).with_message("empty batch result"))
    }
}

/// Produces embeddings for images addressed by URL.
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    /// Embeds a batch of image URLs, returning one vector per input in order.
    async fn embed_images(&self, urls: &[String]) -> Result<Vec<Embedding>>;

    /// The vector dimension this embedder produces.
    fn dimensions(&self) -> usize;

    /// Identifier of the producing model.
    fn model_name(&self) -> &str;

    /// Checks whether the backing service is reachable.
    async fn health_check(&self) -> Result<ServiceHealth>;

    /// Embeds a single image URL.
    async fn embed_image(&self, url: &str) -> Result<Embedding> {
        let urls = [url.to_owned()];
        let mut embeddings = self.embed_images(&urls).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::new(ErrorKind::InternalError).with_message("empty batch result"))
    }
}
