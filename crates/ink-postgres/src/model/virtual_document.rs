//! Virtual document model.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::virtual_documents;

/// A document synthesised from an external tool context.
///
/// Virtual documents have no backing file; their id composes the source
/// type with the external context id. Member chunks reference the document
/// through their `document_id` column.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = virtual_documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VirtualDocument {
    /// Composite document id (`virtual:<source>:<context>`).
    pub document_id: String,
    /// External source type (`remnote`, `logseq`, `editor-template`).
    pub source_type: String,
    /// External context id.
    pub context_id: String,
    /// Optional human title.
    pub title: Option<String>,
    /// Free-form context metadata.
    pub metadata: serde_json::Value,
    /// When the document was created.
    pub created_at: Timestamp,
    /// When the document was last updated.
    pub updated_at: Timestamp,
}

/// Data for creating a virtual document.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = virtual_documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewVirtualDocument {
    /// Composite document id.
    pub document_id: String,
    /// External source type.
    pub source_type: String,
    /// External context id.
    pub context_id: String,
    /// Optional human title.
    pub title: Option<String>,
    /// Free-form context metadata.
    pub metadata: serde_json::Value,
}
