//! Document request DTOs.

use ink_postgres::types::{SortBy, SortOrder, MAX_PAGE_SIZE};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::handler::{Error, ErrorKind};

/// Known virtual document sources.
const VIRTUAL_SOURCES: &[&str] = &["remnote", "logseq", "editor-template"];

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    50
}

/// Query parameters of `GET /documents/{doc_id}/chunks`.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChunksQuery {
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size, capped at 1000.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Whether to include the hierarchy below each page root.
    #[serde(default)]
    pub include_hierarchy: bool,
    /// Sort key.
    #[serde(default)]
    pub sort_by: SortBy,
    /// Sort direction.
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl DocumentChunksQuery {
    /// Validates the pagination bounds.
    pub fn validate_bounds(&self) -> Result<(), Error<'static>> {
        if self.page_size == 0 {
            return Err(ErrorKind::Validation
                .with_message("pageSize must be positive")
                .into_static());
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(ErrorKind::Validation
                .with_message(format!("pageSize must not exceed {MAX_PAGE_SIZE}"))
                .into_static());
        }
        if self.page == 0 {
            return Err(ErrorKind::Validation
                .with_message("page must be positive")
                .into_static());
        }
        Ok(())
    }
}

/// Body of `POST /documents/virtual`.
#[derive(Debug, Clone, Deserialize, Validate, JsonSchema)]
pub struct CreateVirtualDocument {
    /// External source type.
    #[validate(custom(function = "validate_source_type"))]
    pub source_type: String,
    /// External context id.
    #[validate(length(min = 1, message = "context_id must not be empty"))]
    pub context_id: String,
    /// Optional human title.
    pub title: Option<String>,
    /// Free-form context metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn validate_source_type(source_type: &str) -> Result<(), validator::ValidationError> {
    if VIRTUAL_SOURCES.contains(&source_type) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("source_type")
            .with_message(format!("source_type must be one of {VIRTUAL_SOURCES:?}").into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_bounds() {
        let query = DocumentChunksQuery {
            page: 1,
            page_size: 0,
            include_hierarchy: false,
            sort_by: SortBy::Position,
            sort_order: SortOrder::Asc,
        };
        assert!(query.validate_bounds().is_err());

        let query = DocumentChunksQuery {
            page_size: 1001,
            ..query
        };
        assert!(query.validate_bounds().is_err());

        let query = DocumentChunksQuery {
            page_size: 1000,
            ..query
        };
        assert!(query.validate_bounds().is_ok());
    }

    #[test]
    fn virtual_source_types_are_closed() {
        let request: CreateVirtualDocument = serde_json::from_value(serde_json::json!({
            "source_type": "remnote",
            "context_id": "ctx-1"
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let request: CreateVirtualDocument = serde_json::from_value(serde_json::json!({
            "source_type": "notion",
            "context_id": "ctx-1"
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
