//! Deterministic mock providers for tests and offline operation.
//!
//! The mock embedder derives every vector from a SHA-256 digest of the
//! input, so the same input always yields the same unit-norm vector and
//! distinct inputs are extremely unlikely to collide. The mock vision
//! analyzer derives a description and tags from the URL path.

use async_trait::async_trait;
use jiff::Timestamp;
use sha2::{Digest, Sha256};

use crate::emb::{self, Embedding, ImageEmbedder, TextEmbedder};
use crate::vision::{self, DetailLevel, ImageAnalysis, VisionAnalyzer};
use crate::ServiceHealth;

/// Model identifier reported by the mock embedder.
pub const MOCK_EMBEDDING_MODEL: &str = "mock-embedding-v1";

/// Model identifier reported by the mock vision analyzer.
pub const MOCK_VISION_MODEL: &str = "mock-vision-v1";

/// Deterministic embedder seeded by hashing its input.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Creates a mock embedder producing vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, input: &str) -> Embedding {
        let seed = Sha256::digest(input.as_bytes());

        // xorshift64* stream seeded from the digest, one state word per
        // eight digest bytes folded together
        let mut state = seed
            .chunks(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word[..chunk.len()].copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .fold(0x9E3779B97F4A7C15u64, |acc, w| acc ^ w.rotate_left(17));

        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let values: Vec<f32> = (0..self.dimensions)
            .map(|_| {
                let raw = next();
                // map to [-0.5, 0.5]
                (raw as f64 / u64::MAX as f64) as f32 - 0.5
            })
            .collect();

        Embedding::new(values).normalized()
    }
}

#[async_trait]
impl TextEmbedder for MockEmbedder {
    async fn embed_texts(&self, inputs: &[String]) -> emb::Result<Vec<Embedding>> {
        Ok(inputs.iter().map(|input| self.embed_one(input)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        MOCK_EMBEDDING_MODEL
    }

    async fn health_check(&self) -> emb::Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

#[async_trait]
impl ImageEmbedder for MockEmbedder {
    async fn embed_images(&self, urls: &[String]) -> emb::Result<Vec<Embedding>> {
        // prefix keeps image vectors distinct from text vectors of equal input
        Ok(urls
            .iter()
            .map(|url| self.embed_one(&format!("image:{url}")))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        MOCK_EMBEDDING_MODEL
    }

    async fn health_check(&self) -> emb::Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

/// Deterministic vision analyzer deriving its output from the URL.
#[derive(Debug, Clone, Default)]
pub struct MockVision;

impl MockVision {
    /// Creates a new mock vision analyzer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VisionAnalyzer for MockVision {
    async fn analyze(
        &self,
        image_url: &str,
        detail: DetailLevel,
        _language: &str,
    ) -> vision::Result<ImageAnalysis> {
        let file_name = image_url
            .rsplit('/')
            .next()
            .unwrap_or(image_url)
            .split('?')
            .next()
            .unwrap_or(image_url);

        let stem = file_name.rsplit_once('.').map_or(file_name, |(s, _)| s);
        let tags: Vec<String> = stem
            .split(|c: char| c == '-' || c == '_' || c == ' ')
            .filter(|part| !part.is_empty())
            .map(|part| part.to_ascii_lowercase())
            .collect();

        let description = if tags.is_empty() {
            format!("An image stored at {image_url}")
        } else {
            format!("An image depicting {} ({} detail)", tags.join(", "), detail.as_str())
        };

        Ok(ImageAnalysis {
            description,
            tags,
            model: MOCK_VISION_MODEL.to_owned(),
            confidence: 0.9,
            analyzed_at: Timestamp::now(),
        })
    }

    fn model_name(&self) -> &str {
        MOCK_VISION_MODEL
    }

    async fn health_check(&self) -> vision::Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emb::cosine_similarity;

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let embedder = MockEmbedder::new(512);
        let a = embedder.embed_text("cats playing on a sofa").await.unwrap();
        let b = embedder.embed_text("cats playing on a sofa").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.dimensions(), 512);
        assert!((cosine_similarity(&a.values, &b.values) - 1.0).abs() <= 1e-4);
    }

    #[tokio::test]
    async fn distinct_inputs_produce_distinct_vectors() {
        let embedder = MockEmbedder::new(128);
        let a = embedder.embed_text("database sharding").await.unwrap();
        let b = embedder.embed_text("cats on a sofa").await.unwrap();

        assert!(cosine_similarity(&a.values, &b.values) < 0.9);
    }

    #[tokio::test]
    async fn image_and_text_vectors_differ_for_same_input() {
        let embedder = MockEmbedder::new(128);
        let text = embedder.embed_text("photo.png").await.unwrap();
        let image = embedder.embed_image("photo.png").await.unwrap();

        assert_ne!(text, image);
    }

    #[tokio::test]
    async fn vectors_are_unit_norm() {
        let embedder = MockEmbedder::new(1536);
        let embedding = embedder.embed_text("anything").await.unwrap();
        assert!((embedding.norm() - 1.0).abs() <= 1e-4);
    }

    #[tokio::test]
    async fn vision_derives_tags_from_file_name() {
        let vision = MockVision::new();
        let analysis = vision
            .analyze("https://blobs.local/cats-on-sofa.png", DetailLevel::Medium, "en")
            .await
            .unwrap();

        assert_eq!(analysis.tags, vec!["cats", "on", "sofa"]);
        assert!(analysis.description.contains("cats"));
        assert!(analysis.confidence > 0.0);
    }
}
