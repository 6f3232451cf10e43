//! Closed enumerations for the chunk store.
//!
//! Role flags, vector kinds and document scopes arrive from clients as
//! strings or boolean bags; they are narrowed into these enums before any
//! row is written so that invalid combinations cannot reach the database.

use diesel_derive_enum::DbEnum;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The role a chunk plays in the knowledge graph.
///
/// Corresponds to the `CHUNK_ROLE` PostgreSQL enum. A chunk has exactly one
/// role; `Content` covers plain chunks with no special flag set, which keeps
/// the "at most one role flag" invariant structural.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::ChunkRole"]
pub enum ChunkRole {
    /// Plain content chunk
    #[db_rename = "content"]
    #[serde(rename = "content")]
    #[default]
    Content,

    /// Root chunk of a page document
    #[db_rename = "page"]
    #[serde(rename = "page")]
    Page,

    /// Tag chunk referenced by tag edges
    #[db_rename = "tag"]
    #[serde(rename = "tag")]
    Tag,

    /// Template chunk
    #[db_rename = "template"]
    #[serde(rename = "template")]
    Template,

    /// Template slot chunk
    #[db_rename = "slot"]
    #[serde(rename = "slot")]
    Slot,
}

impl ChunkRole {
    /// Returns whether the chunk is a page root.
    #[inline]
    pub fn is_page(self) -> bool {
        matches!(self, ChunkRole::Page)
    }

    /// Returns whether the chunk is a tag.
    #[inline]
    pub fn is_tag(self) -> bool {
        matches!(self, ChunkRole::Tag)
    }

    /// Builds a role from the four wire-level boolean flags.
    ///
    /// Returns `None` when more than one flag is set.
    pub fn from_flags(is_page: bool, is_tag: bool, is_template: bool, is_slot: bool) -> Option<Self> {
        match (is_page, is_tag, is_template, is_slot) {
            (false, false, false, false) => Some(ChunkRole::Content),
            (true, false, false, false) => Some(ChunkRole::Page),
            (false, true, false, false) => Some(ChunkRole::Tag),
            (false, false, true, false) => Some(ChunkRole::Template),
            (false, false, false, true) => Some(ChunkRole::Slot),
            _ => None,
        }
    }
}

/// Which modality produced a chunk's embedding.
///
/// Corresponds to the `VECTOR_KIND` PostgreSQL enum; present on a row
/// exactly when the embedding column is non-null.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::VectorKind"]
pub enum VectorKind {
    /// Embedding produced from chunk text
    #[db_rename = "text"]
    #[serde(rename = "text")]
    Text,

    /// Embedding produced from the stored image
    #[db_rename = "image"]
    #[serde(rename = "image")]
    Image,
}

/// The scope of the document a chunk belongs to.
///
/// Corresponds to the `DOCUMENT_SCOPE` PostgreSQL enum.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::DocumentScope"]
pub enum DocumentScope {
    /// Backed by a real editor file
    #[db_rename = "file"]
    #[serde(rename = "file")]
    #[default]
    File,

    /// Synthesised from an external tool context
    #[db_rename = "virtual"]
    #[serde(rename = "virtual")]
    Virtual,

    /// Grouped under a page chunk
    #[db_rename = "page"]
    #[serde(rename = "page")]
    Page,
}

/// Lifecycle of a batch ingest job.
///
/// Jobs live in the in-process registry, so this enum never touches the
/// database; it shares the module because the batch API renders it next to
/// store types.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Accepted, not yet running
    #[default]
    Queued,
    /// Units are being processed
    Running,
    /// Paused by the caller; in-flight units finish
    Paused,
    /// All units processed
    Completed,
    /// The job itself failed
    Failed,
    /// Cancelled by the caller
    Cancelled,
}

impl BatchStatus {
    /// Returns whether the job has reached a terminal state.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Cancelled
        )
    }
}

/// How a sync conflict between client and server versions is resolved.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// Server state replaced by the client chunk
    LocalWins,
    /// Client change dropped; server returns its current state
    RemoteWins,
    /// Contents concatenated, tags unioned, metadata shallow-merged
    #[default]
    Merge,
    /// Conflict parked for the client to resolve
    Manual,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_from_flags_rejects_multiple() {
        assert_eq!(ChunkRole::from_flags(false, false, false, false), Some(ChunkRole::Content));
        assert_eq!(ChunkRole::from_flags(true, false, false, false), Some(ChunkRole::Page));
        assert_eq!(ChunkRole::from_flags(false, true, false, false), Some(ChunkRole::Tag));
        assert_eq!(ChunkRole::from_flags(true, true, false, false), None);
        assert_eq!(ChunkRole::from_flags(false, false, true, true), None);
    }

    #[test]
    fn batch_status_terminality() {
        assert!(!BatchStatus::Queued.is_terminal());
        assert!(!BatchStatus::Running.is_terminal());
        assert!(!BatchStatus::Paused.is_terminal());
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Cancelled.is_terminal());
    }

    #[test]
    fn conflict_strategy_wire_names() {
        let json = serde_json::to_string(&ConflictStrategy::LocalWins).unwrap();
        assert_eq!(json, "\"local-wins\"");
        let parsed: ConflictStrategy = serde_json::from_str("\"merge\"").unwrap();
        assert_eq!(parsed, ConflictStrategy::Merge);
    }
}
