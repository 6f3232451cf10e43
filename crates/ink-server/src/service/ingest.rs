//! Ingest pipeline: text and media intake with deduplication.

use std::sync::Arc;

use bytes::Bytes;
use ink_core::emb::{Embedding, ImageEmbedder, TextEmbedder};
use ink_core::vision::{DetailLevel, VisionAnalyzer};
use ink_core::RetryConfig;
use ink_opendal::BlobStore;
use ink_postgres::model::{Chunk, NewChunk};
use ink_postgres::query::{ChunkRepository, VectorSearchRepository};
use ink_postgres::types::{
    file_document_id, AiAnalysis, DocumentScope, ImageProperties, MetadataView, StorageInfo,
    VectorKind,
};
use ink_postgres::PgClient;
use pgvector::Vector;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::cache::{SearchCache, WriteDomain};
use super::{EventBus, GatewayEvent, IngestedKind, ServiceError, ServiceResult};

/// Tracing target for ingest operations.
const TRACING_TARGET: &str = "ink_server::service::ingest";

/// A text ingest request.
#[derive(Debug, Clone)]
pub struct TextIngest {
    /// Chunk content.
    pub content: String,
    /// Optional parent chunk.
    pub parent: Option<Uuid>,
    /// Optional owning page chunk.
    pub page: Option<Uuid>,
    /// Tag chunk ids to attach.
    pub tags: Vec<Uuid>,
    /// Free-form metadata.
    pub metadata: serde_json::Value,
    /// Whether to compute a text embedding.
    pub auto_embed: bool,
    /// Explicit document id; derived when absent.
    pub document_id: Option<String>,
    /// Backing file name, for file-scoped chunks.
    pub file_name: Option<String>,
}

/// A media ingest request.
#[derive(Debug, Clone)]
pub struct MediaIngest {
    /// Raw image bytes.
    pub data: Bytes,
    /// Original file name.
    pub file_name: String,
    /// Optional owning page chunk.
    pub page: Option<Uuid>,
    /// Tag chunk ids to attach.
    pub tags: Vec<Uuid>,
    /// Whether to run vision analysis.
    pub auto_analyze: bool,
    /// Whether to compute an image embedding.
    pub auto_embed: bool,
    /// Description language for analysis.
    pub language: String,
    /// Analysis detail level.
    pub detail: DetailLevel,
}

/// Outcome of an ingest call.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The stored (or reused) chunk.
    pub chunk: Chunk,
    /// Whether an existing chunk was reused via blob deduplication.
    pub deduplicated: bool,
}

/// The ingest pipeline.
///
/// Single ingest calls are atomic: every per-step failure maps to the
/// service error taxonomy and aborts the call; partial success exists only
/// at the batch level.
#[derive(Clone)]
pub struct IngestPipeline {
    pg: PgClient,
    blobs: BlobStore,
    text_embedder: Arc<dyn TextEmbedder>,
    image_embedder: Arc<dyn ImageEmbedder>,
    vision: Option<Arc<dyn VisionAnalyzer>>,
    retry: RetryConfig,
    events: EventBus,
    cache: SearchCache,
}

impl IngestPipeline {
    /// Creates the pipeline.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pg: PgClient,
        blobs: BlobStore,
        text_embedder: Arc<dyn TextEmbedder>,
        image_embedder: Arc<dyn ImageEmbedder>,
        vision: Option<Arc<dyn VisionAnalyzer>>,
        events: EventBus,
        cache: SearchCache,
    ) -> Self {
        Self {
            pg,
            blobs,
            text_embedder,
            image_embedder,
            vision,
            retry: RetryConfig::default(),
            events,
            cache,
        }
    }

    /// Returns whether a vision analyzer is configured.
    pub fn has_vision(&self) -> bool {
        self.vision.is_some()
    }

    /// Returns the deployment embedding dimension.
    pub fn vector_dimensions(&self) -> usize {
        self.pg.vector_dimensions()
    }

    /// Builds the store payload for a text ingest without writing it.
    ///
    /// The batch-create path uses this to embed every chunk up front and
    /// commit the whole set in one transaction.
    pub async fn prepare_text(&self, request: TextIngest) -> ServiceResult<NewChunk> {
        if request.content.trim().is_empty() {
            return Err(ServiceError::validation("chunk content must not be empty"));
        }

        let (document_id, document_scope) = derive_document(
            request.document_id.as_deref(),
            request.page,
            request.file_name.as_deref(),
        );

        let mut new_chunk = NewChunk::new(request.content.clone(), document_id);
        new_chunk.document_scope = document_scope;
        new_chunk.parent_id = request.parent;
        new_chunk.page_id = request.page;
        new_chunk.metadata = normalise_metadata(request.metadata);
        new_chunk.file_name = request.file_name;

        if request.auto_embed {
            let embedding = self
                .retry
                .retry(|| async {
                    self.text_embedder
                        .embed_text(&request.content)
                        .await
                        .map_err(ServiceError::from)
                })
                .await?;
            attach_embedding(
                &mut new_chunk,
                embedding,
                VectorKind::Text,
                self.text_embedder.model_name(),
            );
        }

        Ok(new_chunk)
    }

    /// Ingests a text chunk.
    #[tracing::instrument(skip_all, fields(auto_embed = request.auto_embed))]
    pub async fn ingest_text(&self, request: TextIngest) -> ServiceResult<IngestOutcome> {
        let tags = request.tags.clone();
        let new_chunk = self.prepare_text(request).await?;
        let chunk = self.store_chunk(new_chunk, tags).await?;

        self.events.publish(GatewayEvent::Ingested {
            chunk_id: chunk.id,
            kind: IngestedKind::Text,
        });

        tracing::info!(
            target: TRACING_TARGET,
            chunk_id = %chunk.id,
            "Text chunk ingested"
        );

        Ok(IngestOutcome {
            chunk,
            deduplicated: false,
        })
    }

    /// Ingests an image, deduplicating by content hash.
    #[tracing::instrument(
        skip_all,
        fields(
            file_name = %request.file_name,
            auto_analyze = request.auto_analyze,
            auto_embed = request.auto_embed,
        )
    )]
    pub async fn ingest_media(&self, request: MediaIngest) -> ServiceResult<IngestOutcome> {
        if request.data.is_empty() {
            return Err(ServiceError::validation("media payload must not be empty"));
        }

        let file_hash = hex::encode(Sha256::digest(&request.data));

        // dedup before upload: an existing image chunk with the same bytes
        // is reused when the requested page does not contradict it
        let mut conn = self.pg.get_connection().await?;
        let existing = conn.find_chunks_by_file_hash(&file_hash).await?;
        drop(conn);

        if let Some(chunk) = existing
            .into_iter()
            .find(|chunk| request.page.is_none() || chunk.page_id == request.page)
        {
            tracing::info!(
                target: TRACING_TARGET,
                chunk_id = %chunk.id,
                file_hash = %file_hash,
                "Duplicate blob, reusing existing chunk"
            );
            return Ok(IngestOutcome {
                chunk,
                deduplicated: true,
            });
        }

        let stored = self
            .retry
            .retry(|| async {
                self.blobs
                    .upload_bytes(request.data.clone(), &request.file_name)
                    .await
                    .map_err(ServiceError::from)
            })
            .await?;

        let mut metadata = MetadataView::default();
        metadata.set_image();
        metadata.set_storage(&StorageInfo {
            storage_type: self.blobs.backend_name().to_owned(),
            id: stored.key.clone(),
            url: stored.url.clone(),
            file_hash: stored.file_hash.clone(),
        });
        metadata.set_image_properties(&ImageProperties {
            format: image_format(&request.file_name),
            size_bytes: Some(stored.size_bytes),
            width: None,
            height: None,
        });

        let mut content = request.file_name.clone();

        if request.auto_analyze {
            let vision = self.vision.as_ref().ok_or_else(|| {
                ServiceError::validation("auto_analyze requested but no vision service configured")
            })?;

            let analysis = self
                .retry
                .retry(|| async {
                    vision
                        .analyze(&stored.url, request.detail, &request.language)
                        .await
                        .map_err(ServiceError::from)
                })
                .await?;

            if !analysis.description.trim().is_empty() {
                content = analysis.description.clone();
            }
            metadata.set_ai_analysis(&AiAnalysis {
                description: analysis.description,
                tags: analysis.tags,
                model: analysis.model,
                confidence: analysis.confidence,
                analyzed_at: analysis.analyzed_at,
            });
        }

        let document_id = match request.page {
            Some(page) => page.to_string(),
            None => file_document_id(&request.file_name),
        };
        let mut new_chunk = NewChunk::new(content, document_id);
        new_chunk.document_scope = match request.page {
            Some(_) => DocumentScope::Page,
            None => DocumentScope::File,
        };
        new_chunk.page_id = request.page;
        new_chunk.metadata = metadata.into_value();
        new_chunk.file_hash = Some(stored.file_hash.clone());
        new_chunk.file_name = Some(request.file_name.clone());

        if request.auto_embed {
            let embedding = self
                .retry
                .retry(|| async {
                    self.image_embedder
                        .embed_image(&stored.url)
                        .await
                        .map_err(ServiceError::from)
                })
                .await?;
            attach_embedding(
                &mut new_chunk,
                embedding,
                VectorKind::Image,
                self.image_embedder.model_name(),
            );
        }

        let chunk = self.store_chunk(new_chunk, request.tags).await?;

        self.events.publish(GatewayEvent::Ingested {
            chunk_id: chunk.id,
            kind: IngestedKind::Image,
        });

        tracing::info!(
            target: TRACING_TARGET,
            chunk_id = %chunk.id,
            file_hash = %file_hash,
            "Image chunk ingested"
        );

        Ok(IngestOutcome {
            chunk,
            deduplicated: false,
        })
    }

    /// Writes the chunk and invalidates intersecting cache entries.
    async fn store_chunk(&self, new_chunk: NewChunk, tags: Vec<Uuid>) -> ServiceResult<Chunk> {
        let dimensions = self.pg.vector_dimensions();
        let domain = WriteDomain {
            tags: tags.clone(),
            page: new_chunk.page_id,
            kind: new_chunk.vector_kind,
        };

        let mut conn = self.pg.get_connection().await?;
        let chunk = conn.create_chunk(new_chunk, tags, dimensions).await?;
        drop(conn);

        self.cache.invalidate_for_write(&domain).await?;

        Ok(chunk)
    }
}

/// Derives the owning document for a text ingest.
fn derive_document(
    explicit: Option<&str>,
    page: Option<Uuid>,
    file_name: Option<&str>,
) -> (String, DocumentScope) {
    if let Some(document_id) = explicit {
        let scope = if document_id.starts_with("virtual:") {
            DocumentScope::Virtual
        } else if document_id.starts_with("file:") {
            DocumentScope::File
        } else {
            DocumentScope::Page
        };
        return (document_id.to_owned(), scope);
    }

    match (page, file_name) {
        (Some(page), _) => (page.to_string(), DocumentScope::Page),
        (None, Some(file_name)) => (file_document_id(file_name), DocumentScope::File),
        (None, None) => (file_document_id("unfiled"), DocumentScope::File),
    }
}

fn attach_embedding(chunk: &mut NewChunk, embedding: Embedding, kind: VectorKind, model: &str) {
    chunk.embedding = Some(Vector::from(embedding.normalized().into_values()));
    chunk.vector_kind = Some(kind);
    chunk.vector_model = Some(model.to_owned());
}

fn normalise_metadata(metadata: serde_json::Value) -> serde_json::Value {
    MetadataView::new(metadata).into_value()
}

fn image_format(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_derivation_prefers_explicit_id() {
        let (id, scope) = derive_document(Some("virtual:remnote:ctx"), None, Some("a.md"));
        assert_eq!(id, "virtual:remnote:ctx");
        assert_eq!(scope, DocumentScope::Virtual);
    }

    #[test]
    fn document_derivation_uses_page_scope() {
        let page = Uuid::now_v7();
        let (id, scope) = derive_document(None, Some(page), None);
        assert_eq!(id, page.to_string());
        assert_eq!(scope, DocumentScope::Page);
    }

    #[test]
    fn document_derivation_hashes_file_names() {
        let (id, scope) = derive_document(None, None, Some("notes/today.md"));
        assert!(id.starts_with("file:"));
        assert_eq!(scope, DocumentScope::File);
    }

    #[test]
    fn image_format_extraction() {
        assert_eq!(image_format("cats.PNG").as_deref(), Some("png"));
        assert_eq!(image_format("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(image_format("noext"), None);
    }
}
