//! The gateway's tool implementations.

mod chunks;
mod media;
mod search;
mod slides;

use std::sync::Arc;

use ink_server::service::{SearchHit, ServiceState};
use serde_json::{json, Value};

use crate::registry::ToolRegistry;
use crate::TRACING_TARGET;

/// Longest content excerpt rendered into tool output.
const EXCERPT_LEN: usize = 300;

/// Builds the registry for the given state.
///
/// Registration is gated on capability: tools that transitively require
/// the vision service are only registered when one is configured.
pub fn register_tools(state: &ServiceState) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(search::SearchTextTool::new(state.clone())));
    registry.register(Arc::new(search::SearchChunksTool::new(state.clone())));
    registry.register(Arc::new(search::SearchImagesTool::new(state.clone())));
    registry.register(Arc::new(search::HybridSearchTool::new(state.clone())));
    registry.register(Arc::new(chunks::CreateTextChunkTool::new(state.clone())));
    registry.register(Arc::new(chunks::GetChunkTool::new(state.clone())));
    registry.register(Arc::new(media::UploadImageTool::new(state.clone())));
    registry.register(Arc::new(media::BatchProcessImagesTool::new(state.clone())));
    registry.register(Arc::new(slides::GetImagesForSlidesTool::new(state.clone())));

    if state.vision().is_some() {
        registry.register(Arc::new(media::AnalyzeImageTool::new(state.clone())));
    } else {
        tracing::info!(
            target: TRACING_TARGET,
            "No vision service configured, vision tools not registered"
        );
    }

    registry
}

/// Renders search hits as compact JSON for the host model.
pub(crate) fn render_hits(hits: &[SearchHit]) -> String {
    let rendered: Vec<Value> = hits
        .iter()
        .map(|hit| {
            let mut entry = json!({
                "id": hit.chunk.id,
                "content": excerpt(&hit.chunk.content),
                "score": hit.score,
                "match_type": hit.match_type,
            });
            if let Some(reason) = &hit.match_reason {
                entry["match_reason"] = json!(reason);
            }
            if let Some(storage) = hit.chunk.metadata_view().storage() {
                entry["url"] = json!(storage.url);
            }
            entry
        })
        .collect();

    serde_json::to_string_pretty(&json!({ "results": rendered, "total": hits.len() }))
        .unwrap_or_else(|_| "[]".to_owned())
}

/// Clips content to a model-friendly excerpt on a char boundary.
pub(crate) fn excerpt(content: &str) -> String {
    if content.len() <= EXCERPT_LEN {
        return content.to_owned();
    }
    let mut cut = EXCERPT_LEN;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &content[..cut])
}

/// Derives the JSON input schema of a params type.
pub(crate) fn schema_of<T: schemars::JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({"type": "object"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpts_respect_char_boundaries() {
        let long = "ä".repeat(400);
        let clipped = excerpt(&long);
        assert!(clipped.ends_with('…'));
        assert!(clipped.len() <= EXCERPT_LEN + '…'.len_utf8());
    }

    #[test]
    fn short_content_is_untouched() {
        assert_eq!(excerpt("short"), "short");
    }
}
