// Table definitions for the unified chunk store.
//
// The store is a single `chunks` table with auxiliary tables for tag
// edges, the precomputed hierarchy closure, the search cache, and
// virtual documents. Vector search partitions on `vector_kind` through
// partial indexes created alongside the tables.

pub mod sql_types {
    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "chunk_role"))]
    pub struct ChunkRole;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "document_scope"))]
    pub struct DocumentScope;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "vector_kind"))]
    pub struct VectorKind;
}

diesel::table! {
    use diesel::sql_types::*;
    use pgvector::sql_types::*;
    use super::sql_types::{ChunkRole, DocumentScope, VectorKind};

    chunks (id) {
        id -> Uuid,
        content -> Text,
        role -> ChunkRole,
        parent_id -> Nullable<Uuid>,
        page_id -> Nullable<Uuid>,
        external_ref -> Nullable<Text>,
        document_id -> Text,
        document_scope -> DocumentScope,
        metadata -> Jsonb,
        file_hash -> Nullable<Text>,
        embedding -> Nullable<Vector>,
        vector_kind -> Nullable<VectorKind>,
        vector_model -> Nullable<Text>,
        file_name -> Nullable<Text>,
        line_start -> Nullable<Int4>,
        line_end -> Nullable<Int4>,
        char_start -> Nullable<Int4>,
        char_end -> Nullable<Int4>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    chunk_tags (chunk_id, tag_id) {
        chunk_id -> Uuid,
        tag_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    chunk_hierarchy (ancestor_id, descendant_id) {
        ancestor_id -> Uuid,
        descendant_id -> Uuid,
        depth -> Int4,
        path -> Text,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    search_cache (fingerprint) {
        fingerprint -> Text,
        params -> Jsonb,
        chunk_ids -> Array<Uuid>,
        result_count -> Int4,
        created_at -> Timestamptz,
        expires_at -> Timestamptz,
        hit_count -> Int4,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    virtual_documents (document_id) {
        document_id -> Text,
        source_type -> Text,
        context_id -> Text,
        title -> Nullable<Text>,
        metadata -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    chunks,
    chunk_tags,
    chunk_hierarchy,
    search_cache,
    virtual_documents,
);
