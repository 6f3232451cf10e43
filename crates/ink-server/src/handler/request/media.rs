//! Media request DTOs.

use ink_core::vision::DetailLevel;
use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_owned()
}

fn default_threshold() -> f64 {
    0.95
}

fn default_min_group_size() -> usize {
    2
}

fn default_max_suggestions() -> i64 {
    5
}

fn default_min_relevance() -> f64 {
    0.5
}

/// Body of `POST /media/upload` (base64 variant).
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct UploadMediaRequest {
    /// Original file name.
    #[validate(length(min = 1, message = "file_name must not be empty"))]
    pub file_name: String,
    /// Base64-encoded file content.
    #[validate(length(min = 1, message = "data must not be empty"))]
    pub data: String,
    /// Whether to run vision analysis.
    #[serde(default = "default_true")]
    pub auto_analyze: bool,
    /// Whether to compute an image embedding.
    #[serde(default = "default_true")]
    pub auto_embed: bool,
    /// Owning page chunk.
    pub page_id: Option<Uuid>,
    /// Tag chunk ids.
    #[serde(default)]
    pub tags: Vec<Uuid>,
    /// Requested storage backend; must match the configured one.
    pub storage_type: Option<String>,
    /// Description language for analysis.
    #[serde(default = "default_language")]
    pub language: String,
    /// Analysis detail level.
    #[serde(default)]
    pub detail: DetailLevel,
}

/// One inline file of a media batch.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct BatchFileRequest {
    /// Original file name.
    #[validate(length(min = 1, message = "file_name must not be empty"))]
    pub file_name: String,
    /// Base64-encoded file content.
    #[validate(length(min = 1, message = "data must not be empty"))]
    pub data: String,
}

/// Body of `POST /media/batch`.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct BatchMediaRequest {
    /// Inline files.
    #[serde(default)]
    #[validate(nested)]
    pub files: Vec<BatchFileRequest>,
    /// Server-side folder to expand.
    pub folder: Option<String>,
    /// Owning page for every chunk.
    pub page_id: Option<Uuid>,
    /// Tags for every chunk.
    #[serde(default)]
    pub tags: Vec<Uuid>,
    /// Whether units run vision analysis.
    #[serde(default = "default_true")]
    pub auto_analyze: bool,
    /// Whether units compute embeddings.
    #[serde(default = "default_true")]
    pub auto_embed: bool,
    /// Parallel units.
    pub concurrency: Option<usize>,
    /// Description language for analysis.
    #[serde(default = "default_language")]
    pub language: String,
    /// Analysis detail level.
    #[serde(default)]
    pub detail: DetailLevel,
}

/// Body of `POST /media/find-duplicates`.
#[derive(Debug, Clone, Copy, Deserialize, Validate, JsonSchema)]
pub struct FindDuplicatesRequest {
    /// Cosine similarity above which images count as near-duplicates.
    #[serde(default = "default_threshold")]
    #[validate(range(min = 0.0, max = 1.0, message = "similarity_threshold must be within [0, 1]"))]
    pub similarity_threshold: f64,
    /// Smallest reported group size.
    #[serde(default = "default_min_group_size")]
    #[validate(range(min = 2, message = "min_group_size must be at least 2"))]
    pub min_group_size: usize,
}

/// Body of `POST /media/recommend-slides`.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct RecommendSlidesRequest {
    /// Slide title.
    pub slide_title: Option<String>,
    /// Slide body text.
    #[validate(length(min = 1, message = "slide_content must not be empty"))]
    pub slide_content: String,
    /// Deck context.
    pub slide_context: Option<String>,
    /// Maximum suggestions.
    #[serde(default = "default_max_suggestions")]
    #[validate(range(min = 1, max = 50, message = "max_suggestions must be between 1 and 50"))]
    pub max_suggestions: i64,
    /// Minimum relevance score.
    #[serde(default = "default_min_relevance")]
    #[validate(range(min = 0.0, max = 1.0, message = "min_relevance must be within [0, 1]"))]
    pub min_relevance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_defaults() {
        let request: UploadMediaRequest = serde_json::from_value(serde_json::json!({
            "file_name": "cats.png",
            "data": "aGVsbG8="
        }))
        .unwrap();
        assert!(request.auto_analyze);
        assert!(request.auto_embed);
        assert_eq!(request.language, "en");
        assert_eq!(request.detail, DetailLevel::Medium);
    }

    #[test]
    fn duplicate_thresholds_are_validated() {
        let request: FindDuplicatesRequest = serde_json::from_value(serde_json::json!({
            "similarity_threshold": 1.5
        }))
        .unwrap();
        assert!(request.validate().is_err());

        let request: FindDuplicatesRequest =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(request.validate().is_ok());
        assert!((request.similarity_threshold - 0.95).abs() <= 1e-9);
    }
}
