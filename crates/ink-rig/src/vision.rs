//! Vision analyzer over a rig agent.

use std::sync::Arc;

use async_trait::async_trait;
use ink_core::vision::{self, DetailLevel, ErrorKind, ImageAnalysis, VisionAnalyzer};
use ink_core::ServiceHealth;
use jiff::Timestamp;
use rig::agent::{Agent, AgentBuilder};
use rig::completion::Prompt;
use rig::prelude::CompletionClient;
use rig::providers::openai;
use serde::Deserialize;

use crate::{TRACING_TARGET, VisionConfig};

const PREAMBLE: &str = "\
You are a vision analysis assistant specialized in understanding and describing visual content.
Your task is to analyze images and provide accurate, factual information based on what you observe.
If you cannot determine something with certainty, say so.
Always answer with a single JSON object and nothing else.";

const PROMPT_TEMPLATE: &str = "\
Analyze the image at the given URL at {detail} detail and answer in {language}.
Respond with a JSON object of the shape:
{\"description\": \"1-3 sentence description\", \"tags\": [\"lowercase\", \"keywords\"], \"confidence\": 0.0}

[Image: {url}]";

/// Vision analyzer backed by a rig agent over an OpenAI-compatible model.
#[derive(Clone)]
pub struct RigVisionAnalyzer {
    inner: Arc<RigVisionAnalyzerInner>,
}

struct RigVisionAnalyzerInner {
    agent: Agent<openai::CompletionModel>,
    model_name: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    0.5
}

impl RigVisionAnalyzer {
    /// Creates a vision analyzer from configuration.
    pub fn new(config: &VisionConfig) -> vision::Result<Self> {
        let client = match &config.endpoint {
            Some(endpoint) => openai::Client::builder()
                .api_key(&config.api_key)
                .base_url(endpoint)
                .build(),
            None => openai::Client::new(&config.api_key),
        }
        .map_err(|e| {
            vision::Error::new(ErrorKind::InternalError)
                .with_message(format!("openai client: {e}"))
        })?;

        let model = client.completions_api().completion_model(&config.model);
        let agent = AgentBuilder::new(model).preamble(PREAMBLE).build();

        tracing::info!(
            target: TRACING_TARGET,
            model = %config.model,
            "Vision analyzer initialized"
        );

        Ok(Self {
            inner: Arc::new(RigVisionAnalyzerInner {
                agent,
                model_name: config.model.clone(),
            }),
        })
    }
}

#[async_trait]
impl VisionAnalyzer for RigVisionAnalyzer {
    async fn analyze(
        &self,
        image_url: &str,
        detail: DetailLevel,
        language: &str,
    ) -> vision::Result<ImageAnalysis> {
        let prompt = PROMPT_TEMPLATE
            .replace("{detail}", detail.as_str())
            .replace("{language}", language)
            .replace("{url}", image_url);

        tracing::debug!(
            target: TRACING_TARGET,
            image_url = %image_url,
            detail = %detail.as_str(),
            "Analyzing image"
        );

        let completion = self
            .inner
            .agent
            .prompt(&prompt)
            .await
            .map_err(|e| classify_prompt_error(&e.to_string()))?;

        let payload = parse_analysis(&completion);

        Ok(ImageAnalysis {
            description: payload.description,
            tags: payload.tags,
            model: self.inner.model_name.clone(),
            confidence: payload.confidence.clamp(0.0, 1.0),
            analyzed_at: Timestamp::now(),
        })
    }

    fn model_name(&self) -> &str {
        &self.inner.model_name
    }

    async fn health_check(&self) -> vision::Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

impl std::fmt::Debug for RigVisionAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigVisionAnalyzer")
            .field("model", &self.inner.model_name)
            .finish()
    }
}

/// Extracts the analysis JSON out of a completion.
///
/// Models occasionally wrap the object in prose or code fences; the parser
/// takes the widest brace-delimited span and falls back to treating the
/// whole completion as the description when no valid object is present.
fn parse_analysis(completion: &str) -> AnalysisPayload {
    let candidate = match (completion.find('{'), completion.rfind('}')) {
        (Some(start), Some(end)) if end > start => &completion[start..=end],
        _ => completion,
    };

    serde_json::from_str(candidate).unwrap_or_else(|_| AnalysisPayload {
        description: completion.trim().to_owned(),
        tags: vec![],
        confidence: default_confidence(),
    })
}

fn classify_prompt_error(message: &str) -> vision::Error {
    let lowered = message.to_ascii_lowercase();
    let kind = if lowered.contains("401") || lowered.contains("unauthorized") {
        ErrorKind::Authentication
    } else if lowered.contains("429") || lowered.contains("rate limit") {
        ErrorKind::RateLimited
    } else if lowered.contains("timeout") || lowered.contains("timed out") {
        ErrorKind::Timeout
    } else if lowered.contains("image") && lowered.contains("invalid") {
        ErrorKind::UnsupportedImage
    } else {
        ErrorKind::ServiceUnavailable
    };
    vision::Error::new(kind).with_message(message.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let payload = parse_analysis(
            r#"{"description": "Two cats on a sofa", "tags": ["cats", "sofa"], "confidence": 0.92}"#,
        );
        assert_eq!(payload.description, "Two cats on a sofa");
        assert_eq!(payload.tags, vec!["cats", "sofa"]);
        assert!((payload.confidence - 0.92).abs() <= 1e-4);
    }

    #[test]
    fn parses_fenced_json() {
        let payload = parse_analysis(
            "Here you go:\n```json\n{\"description\": \"A server rack\", \"tags\": [\"server\"], \"confidence\": 0.8}\n```",
        );
        assert_eq!(payload.description, "A server rack");
        assert_eq!(payload.tags, vec!["server"]);
    }

    #[test]
    fn falls_back_to_plain_text() {
        let payload = parse_analysis("A hand-drawn diagram of a database.");
        assert_eq!(payload.description, "A hand-drawn diagram of a database.");
        assert!(payload.tags.is_empty());
        assert!((payload.confidence - 0.5).abs() <= 1e-4);
    }

    #[test]
    fn missing_fields_default() {
        let payload = parse_analysis(r#"{"description": "Just a description"}"#);
        assert!(payload.tags.is_empty());
        assert!((payload.confidence - 0.5).abs() <= 1e-4);
    }
}
