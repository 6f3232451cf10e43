//! Typed projections over the chunk metadata bag.
//!
//! Chunk metadata is a free-form JSON object with a handful of reserved
//! keys. [`MetadataView`] projects those keys into typed structures while
//! preserving everything else verbatim, so clients can round-trip keys the
//! gateway does not know about.

use jiff::Timestamp;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved key marking image chunks.
pub const KEY_MEDIA_TYPE: &str = "media_type";
/// Reserved key locating the stored blob.
pub const KEY_STORAGE: &str = "storage";
/// Reserved key describing the image file.
pub const KEY_IMAGE_PROPERTIES: &str = "image_properties";
/// Reserved key holding AI-derived analysis.
pub const KEY_AI_ANALYSIS: &str = "ai_analysis";

/// Location of a chunk's binary blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct StorageInfo {
    /// Backend type (`fs`, `s3`, `gdrive`).
    #[serde(rename = "type")]
    pub storage_type: String,
    /// Opaque storage handle returned by the blob adapter.
    pub id: String,
    /// Stable URL of the blob.
    pub url: String,
    /// SHA-256 hash of the blob contents, hex encoded.
    pub file_hash: String,
}

/// Physical properties of a stored image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ImageProperties {
    /// Image format, e.g. `png`.
    pub format: Option<String>,
    /// File size in bytes.
    pub size_bytes: Option<u64>,
    /// Pixel width, when known.
    pub width: Option<u32>,
    /// Pixel height, when known.
    pub height: Option<u32>,
}

/// AI-derived description of an image chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct AiAnalysis {
    /// Natural-language description.
    pub description: String,
    /// Tags naming subjects and concepts.
    pub tags: Vec<String>,
    /// Identifier of the producing model.
    pub model: String,
    /// Model confidence in [0, 1].
    pub confidence: f32,
    /// When the analysis was performed.
    pub analyzed_at: Timestamp,
}

/// A typed view over a chunk's metadata object.
///
/// Construction never fails: malformed reserved keys are treated as absent
/// and left untouched in the underlying bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataView {
    bag: Map<String, Value>,
}

impl MetadataView {
    /// Wraps an existing metadata value.
    ///
    /// Non-object values are replaced with an empty object; metadata is an
    /// object by contract and anything else is legacy noise.
    pub fn new(metadata: Value) -> Self {
        let bag = match metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { bag }
    }

    /// Returns whether this metadata marks an image chunk.
    pub fn is_image(&self) -> bool {
        self.bag
            .get(KEY_MEDIA_TYPE)
            .and_then(Value::as_str)
            .is_some_and(|v| v == "image")
    }

    /// Marks this metadata as describing an image chunk.
    pub fn set_image(&mut self) {
        self.bag
            .insert(KEY_MEDIA_TYPE.to_owned(), Value::String("image".to_owned()));
    }

    /// Returns the storage projection, if present and well-formed.
    pub fn storage(&self) -> Option<StorageInfo> {
        self.projection(KEY_STORAGE)
    }

    /// Replaces the storage projection.
    pub fn set_storage(&mut self, storage: &StorageInfo) {
        self.set_projection(KEY_STORAGE, storage);
    }

    /// Returns the image properties projection, if present and well-formed.
    pub fn image_properties(&self) -> Option<ImageProperties> {
        self.projection(KEY_IMAGE_PROPERTIES)
    }

    /// Replaces the image properties projection.
    pub fn set_image_properties(&mut self, properties: &ImageProperties) {
        self.set_projection(KEY_IMAGE_PROPERTIES, properties);
    }

    /// Returns the AI analysis projection, if present and well-formed.
    pub fn ai_analysis(&self) -> Option<AiAnalysis> {
        self.projection(KEY_AI_ANALYSIS)
    }

    /// Replaces the AI analysis projection.
    pub fn set_ai_analysis(&mut self, analysis: &AiAnalysis) {
        self.set_projection(KEY_AI_ANALYSIS, analysis);
    }

    /// Returns a raw value from the schemaless part of the bag.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.bag.get(key)
    }

    /// Inserts a raw value into the bag.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.bag.insert(key.into(), value);
    }

    /// Shallowly merges `overlay` on top of this bag, overlay keys winning.
    pub fn merge_overlay(&mut self, overlay: &MetadataView) {
        for (key, value) in &overlay.bag {
            self.bag.insert(key.clone(), value.clone());
        }
    }

    /// Returns the underlying JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.bag)
    }

    /// Returns the underlying JSON object without consuming the view.
    pub fn to_value(&self) -> Value {
        Value::Object(self.bag.clone())
    }

    fn projection<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.bag
            .get(key)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    fn set_projection<T: Serialize>(&mut self, key: &str, value: &T) {
        if let Ok(value) = serde_json::to_value(value) {
            self.bag.insert(key.to_owned(), value);
        }
    }
}

impl From<Value> for MetadataView {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn storage_round_trip() {
        let mut view = MetadataView::default();
        let storage = StorageInfo {
            storage_type: "fs".into(),
            id: "blobs/ab/cd".into(),
            url: "ink://fs/blobs/ab/cd".into(),
            file_hash: "deadbeef".into(),
        };
        view.set_storage(&storage);

        assert_eq!(view.storage(), Some(storage));
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let mut view = MetadataView::new(json!({"client_state": {"cursor": 42}}));
        view.set_image();

        let value = view.into_value();
        assert_eq!(value["client_state"]["cursor"], json!(42));
        assert_eq!(value["media_type"], json!("image"));
    }

    #[test]
    fn malformed_projection_reads_as_absent() {
        let view = MetadataView::new(json!({"storage": "not an object"}));
        assert!(view.storage().is_none());
        // and the raw value survives
        assert_eq!(view.get("storage"), Some(&json!("not an object")));
    }

    #[test]
    fn overlay_wins_on_merge() {
        let mut base = MetadataView::new(json!({"a": 1, "b": 1}));
        let overlay = MetadataView::new(json!({"b": 2, "c": 3}));
        base.merge_overlay(&overlay);

        let value = base.into_value();
        assert_eq!(value["a"], json!(1));
        assert_eq!(value["b"], json!(2));
        assert_eq!(value["c"], json!(3));
    }

    #[test]
    fn non_object_metadata_is_replaced() {
        let view = MetadataView::new(json!(["legacy"]));
        assert_eq!(view.into_value(), json!({}));
    }
}
