//! Search response DTOs.

use schemars::JsonSchema;
use serde::Serialize;

use super::ChunkResponse;
use crate::service::{MatchType, SearchHit};

/// One ranked search result.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SearchResultResponse {
    /// The matching chunk.
    pub chunk: ChunkResponse,
    /// Fusion or similarity score.
    pub score: f64,
    /// Which side(s) matched.
    pub match_type: MatchType,
    /// Text-side cosine similarity, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_similarity: Option<f64>,
    /// Image-side cosine similarity, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_similarity: Option<f64>,
    /// Human-readable match reason, for slide recommendations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_reason: Option<String>,
}

impl SearchResultResponse {
    /// Builds the response from a service-level hit and its tag set.
    pub fn from_hit(hit: SearchHit, tags: Vec<uuid::Uuid>) -> Self {
        Self {
            chunk: ChunkResponse::from_chunk(hit.chunk, tags),
            score: hit.score,
            match_type: hit.match_type,
            text_similarity: hit.text_similarity,
            image_similarity: hit.image_similarity,
            match_reason: hit.match_reason,
        }
    }
}

/// The ranked result list of a search request.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SearchResponse {
    /// Results, most relevant first.
    pub results: Vec<SearchResultResponse>,
    /// Number of results returned.
    pub total: usize,
}
