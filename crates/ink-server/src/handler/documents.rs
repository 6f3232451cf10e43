//! Document handlers: listings and virtual documents.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::http::StatusCode;
use ink_postgres::model::NewVirtualDocument;
use ink_postgres::query::{
    ChunkRepository, HierarchyRepository, TagRepository, VirtualDocumentRepository,
};
use ink_postgres::types::{virtual_document_id, Pagination};
use uuid::Uuid;

use crate::extract::{Json, Path, PgPool, Query, ValidateJson};
use crate::handler::request::{CreateVirtualDocument, DocumentChunksQuery, DocumentPathParams};
use crate::handler::response::{
    ChunkResponse, DocumentChunksResponse, ErrorResponse, HierarchyChunkResponse,
    VirtualDocumentResponse,
};
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for document operations.
const TRACING_TARGET: &str = "ink_server::handler::documents";

/// Lists the chunks of a document, paginated.
#[tracing::instrument(skip_all, fields(document_id = %path_params.doc_id))]
async fn list_document_chunks(
    PgPool(mut conn): PgPool,
    Path(path_params): Path<DocumentPathParams>,
    Query(query): Query<DocumentChunksQuery>,
) -> Result<(StatusCode, Json<DocumentChunksResponse>)> {
    query.validate_bounds()?;

    tracing::debug!(target: TRACING_TARGET, "Listing document chunks");

    let pagination = Pagination::for_page(query.page, query.page_size);
    let chunks = conn
        .list_document_chunks(&path_params.doc_id, pagination, query.sort_by, query.sort_order)
        .await?;
    let total = conn.count_document_chunks(&path_params.doc_id).await?;

    let ids: Vec<Uuid> = chunks.iter().map(|c| c.id).collect();
    let mut tags_by_chunk = conn.list_tags_for_chunks(&ids).await?;

    let hierarchy = if query.include_hierarchy {
        let mut nodes = Vec::new();
        for &root in &ids {
            for node in conn.find_descendants(root, None).await? {
                let tags = conn.list_chunk_tags(node.chunk.id).await?;
                nodes.push(HierarchyChunkResponse {
                    chunk: ChunkResponse::from_chunk(node.chunk, tags),
                    depth: node.depth,
                });
            }
        }
        Some(nodes)
    } else {
        None
    };

    let response = DocumentChunksResponse {
        document_id: path_params.doc_id,
        chunks: chunks
            .into_iter()
            .map(|chunk| {
                let tags = tags_by_chunk.remove(&chunk.id).unwrap_or_default();
                ChunkResponse::from_chunk(chunk, tags)
            })
            .collect(),
        total,
        page: query.page,
        page_size: query.page_size,
        hierarchy,
    };

    Ok((StatusCode::OK, Json(response)))
}

fn list_document_chunks_docs(op: TransformOperation) -> TransformOperation {
    op.summary("List document chunks")
        .description("Returns a stable-ordered page of a document's chunks; pageSize is capped at 1000.")
        .response::<200, Json<DocumentChunksResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Creates (or refreshes) a virtual document.
#[tracing::instrument(skip_all, fields(source_type = %request.source_type))]
async fn create_virtual_document(
    PgPool(mut conn): PgPool,
    ValidateJson(request): ValidateJson<CreateVirtualDocument>,
) -> Result<(StatusCode, Json<VirtualDocumentResponse>)> {
    tracing::debug!(target: TRACING_TARGET, "Creating virtual document");

    let document_id = virtual_document_id(&request.source_type, &request.context_id);
    let document = conn
        .upsert_virtual_document(NewVirtualDocument {
            document_id,
            source_type: request.source_type,
            context_id: request.context_id,
            title: request.title,
            metadata: request.metadata,
        })
        .await?;

    tracing::info!(
        target: TRACING_TARGET,
        document_id = %document.document_id,
        "Virtual document created"
    );

    Ok((StatusCode::CREATED, Json(document.into())))
}

fn create_virtual_document_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Create virtual document")
        .description("Registers a tool-synthesised document keyed by source type and context id.")
        .response::<201, Json<VirtualDocumentResponse>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<401, Json<ErrorResponse>>()
}

/// Returns a [`Router`] with all related routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route(
            "/documents/{doc_id}/chunks",
            get_with(list_document_chunks, list_document_chunks_docs),
        )
        .api_route(
            "/documents/virtual",
            post_with(create_virtual_document, create_virtual_document_docs),
        )
        .with_path_items(|item| item.tag("Documents"))
}
