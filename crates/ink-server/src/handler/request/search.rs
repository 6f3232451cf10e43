//! Search request DTOs.

use ink_postgres::query::TagLogic;
use jiff::Timestamp;
use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::service::{ImageReference, SearchFilters, SearchKind};

fn default_limit() -> i64 {
    10
}

/// Relative weights of the two sides of a hybrid search.
///
/// Required whenever both a text and an image query are present; there is
/// no server-side default.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub struct Weights {
    /// Weight of the text side.
    pub text: f64,
    /// Weight of the image side.
    pub image: f64,
}

/// Date range filter over `last_updated`.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub struct DateRange {
    /// Inclusive lower bound.
    pub from: Option<Timestamp>,
    /// Inclusive upper bound.
    pub to: Option<Timestamp>,
}

/// Post-filters of a search request.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SearchFiltersRequest {
    /// Required tags.
    #[serde(default)]
    pub tags: Vec<Uuid>,
    /// Combinator for `tags`.
    #[serde(default)]
    pub tag_logic: TagLogic,
    /// Tags that disqualify a result.
    #[serde(default)]
    pub exclude_tags: Vec<Uuid>,
    /// Restricts to page roots (or non-pages).
    pub is_page: Option<bool>,
    /// Restricts by last update time.
    pub date_range: Option<DateRange>,
}

impl From<SearchFiltersRequest> for SearchFilters {
    fn from(request: SearchFiltersRequest) -> Self {
        Self {
            tags: request.tags,
            tag_logic: request.tag_logic,
            exclude_tags: request.exclude_tags,
            is_page: request.is_page,
            date_from: request.date_range.and_then(|r| r.from),
            date_to: request.date_range.and_then(|r| r.to),
        }
    }
}

/// Body of `POST /search/multimodal`.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct MultimodalSearch {
    /// Text query.
    pub text_query: Option<String>,
    /// Image query: a URL or an existing chunk id.
    pub image_query: Option<String>,
    /// Vector partition selector.
    #[serde(default)]
    pub vector_type: SearchKind,
    /// Hybrid fusion weights; required when both queries are present.
    pub weights: Option<Weights>,
    /// Maximum results.
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    /// Minimum similarity score.
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0, message = "min_similarity must be within [0, 1]"))]
    pub min_similarity: f64,
    /// Post-filters.
    #[serde(default)]
    pub filters: SearchFiltersRequest,
}

impl MultimodalSearch {
    /// Parses the image query into a reference.
    ///
    /// A value that parses as a UUID addresses an existing chunk;
    /// everything else is treated as a fetchable URL.
    pub fn image_reference(&self) -> Option<ImageReference> {
        self.image_query.as_ref().map(|raw| {
            match Uuid::parse_str(raw) {
                Ok(chunk_id) => ImageReference::Chunk(chunk_id),
                Err(_) => ImageReference::Url(raw.clone()),
            }
        })
    }

    /// Returns whether both query sides are present.
    pub fn is_hybrid(&self) -> bool {
        self.text_query.as_deref().is_some_and(|q| !q.trim().is_empty())
            && self.image_query.is_some()
    }
}

/// Query parameters of `GET /chunks/{id}/similar`.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub struct SimilarQuery {
    /// Maximum results.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Minimum similarity score.
    #[serde(default)]
    pub min_score: f64,
}

/// Query parameters of `GET /chunks/{id}/hierarchy`.
#[derive(Debug, Clone, Copy, Default, Deserialize, JsonSchema)]
pub struct HierarchyQuery {
    /// Maximum depth below the root; capped at 100.
    pub max_depth: Option<i32>,
}

/// Body of `POST /tags/search`.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct TagSearchRequest {
    /// Tag chunk ids.
    #[validate(length(min = 1, message = "tags must not be empty"))]
    pub tags: Vec<Uuid>,
    /// Membership combinator.
    #[serde(default)]
    pub logic: TagLogic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_reference_distinguishes_chunks_from_urls() {
        let chunk_id = Uuid::now_v7();
        let request: MultimodalSearch = serde_json::from_value(serde_json::json!({
            "image_query": chunk_id.to_string()
        }))
        .unwrap();
        assert!(matches!(
            request.image_reference(),
            Some(ImageReference::Chunk(id)) if id == chunk_id
        ));

        let request: MultimodalSearch = serde_json::from_value(serde_json::json!({
            "image_query": "https://blobs.local/cats.png"
        }))
        .unwrap();
        assert!(matches!(request.image_reference(), Some(ImageReference::Url(_))));
    }

    #[test]
    fn hybrid_detection() {
        let request: MultimodalSearch = serde_json::from_value(serde_json::json!({
            "text_query": "cat sofa",
            "image_query": "https://blobs.local/cats.png",
            "weights": {"text": 0.6, "image": 0.4}
        }))
        .unwrap();
        assert!(request.is_hybrid());

        let request: MultimodalSearch = serde_json::from_value(serde_json::json!({
            "text_query": "cat sofa"
        }))
        .unwrap();
        assert!(!request.is_hybrid());
    }

    #[test]
    fn limit_bounds_are_validated() {
        let request: MultimodalSearch = serde_json::from_value(serde_json::json!({
            "text_query": "x",
            "limit": 0
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
