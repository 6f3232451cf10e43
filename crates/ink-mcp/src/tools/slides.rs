//! Slide recommendation tool.

use async_trait::async_trait;
use ink_server::service::{ServiceState, SlideRequest};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{render_hits, schema_of};
use crate::registry::{Tool, ToolError};

fn default_max_suggestions() -> i64 {
    5
}

fn default_min_relevance() -> f64 {
    0.5
}

/// Arguments of `ink_get_images_for_slides`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetImagesForSlidesParams {
    /// Slide title; weighted ahead of the body.
    pub slide_title: Option<String>,
    /// Slide body text.
    pub slide_content: String,
    /// Deck context.
    pub slide_context: Option<String>,
    /// Maximum suggestions (default 5).
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: i64,
    /// Minimum relevance score (default 0.5).
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,
}

/// Recommends stored images for a presentation slide.
pub struct GetImagesForSlidesTool {
    state: ServiceState,
}

impl GetImagesForSlidesTool {
    /// Creates the tool.
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for GetImagesForSlidesTool {
    fn name(&self) -> &'static str {
        "ink_get_images_for_slides"
    }

    fn description(&self) -> &'static str {
        "Recommends stored images matching a slide's title and content, with match reasons."
    }

    fn input_schema(&self) -> Value {
        schema_of::<GetImagesForSlidesParams>()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let params: GetImagesForSlidesParams = serde_json::from_value(args)
            .map_err(|e| ToolError::new(format!("invalid arguments: {e}")))?;

        let hits = self
            .state
            .retrieval()
            .recommend_for_slide(SlideRequest {
                title: params.slide_title,
                content: params.slide_content,
                context: params.slide_context,
                max_suggestions: params.max_suggestions,
                min_relevance: params.min_relevance,
            })
            .await?;

        Ok(render_hits(&hits))
    }
}
