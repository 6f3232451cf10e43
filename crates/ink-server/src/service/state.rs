//! Application state and dependency injection.
//!
//! The state is the composition root: every port and service is assembled
//! exactly once at startup and handed to handlers by reference, so no
//! handler reaches for a global locator.

use std::sync::Arc;

use ink_core::emb::{ImageEmbedder, TextEmbedder};
use ink_core::vision::VisionAnalyzer;
use ink_opendal::BlobStore;
use ink_postgres::PgClient;

use super::batch::BatchScheduler;
use super::cache::SearchCache;
use super::ingest::IngestPipeline;
use super::retrieval::RetrievalEngine;
use super::sync::SyncCore;
use super::{EventBus, ServiceConfig, ServiceResult};
use crate::middleware::BearerToken;

/// The AI ports wired in by the composition root.
///
/// Vision is optional: deployments without a vision model still serve
/// text and image search, and vision-dependent surfaces are simply not
/// registered.
pub struct AiPorts {
    /// Text embedding port.
    pub text_embedder: Arc<dyn TextEmbedder>,
    /// Image embedding port.
    pub image_embedder: Arc<dyn ImageEmbedder>,
    /// Vision analysis port, when configured.
    pub vision: Option<Arc<dyn VisionAnalyzer>>,
}

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    pg_client: PgClient,
    blob_store: BlobStore,
    events: EventBus,
    cache: SearchCache,
    ingest: Arc<IngestPipeline>,
    batch: BatchScheduler,
    retrieval: Arc<RetrievalEngine>,
    sync: Arc<SyncCore>,
    vision: Option<Arc<dyn VisionAnalyzer>>,
    config: Arc<ServiceConfig>,
}

impl ServiceState {
    /// Assembles the full service graph from configuration and ports.
    pub async fn from_config(config: ServiceConfig, ports: AiPorts) -> ServiceResult<Self> {
        let pg_client = PgClient::new(config.db.clone())?;
        let blob_store = BlobStore::new(config.blob.clone())?;
        let events = EventBus::new();
        let cache = SearchCache::new(pg_client.clone(), config.cache.clone(), events.clone());

        let ingest = Arc::new(IngestPipeline::new(
            pg_client.clone(),
            blob_store.clone(),
            ports.text_embedder.clone(),
            ports.image_embedder.clone(),
            ports.vision.clone(),
            events.clone(),
            cache.clone(),
        ));
        let batch = BatchScheduler::new(ingest.clone(), config.batch.clone());
        let retrieval = Arc::new(RetrievalEngine::new(
            pg_client.clone(),
            ports.text_embedder,
            ports.image_embedder,
            cache.clone(),
        ));
        let sync = Arc::new(SyncCore::new(
            pg_client.clone(),
            config.sync.clone(),
            events.clone(),
            cache.clone(),
        ));

        Ok(Self {
            pg_client,
            blob_store,
            events,
            cache,
            ingest,
            batch,
            retrieval,
            sync,
            vision: ports.vision,
            config: Arc::new(config),
        })
    }

    /// Returns the configured bearer token.
    pub fn bearer_token(&self) -> BearerToken {
        BearerToken(self.config.auth_token.clone())
    }

    /// Returns the database client.
    pub fn pg_client(&self) -> &PgClient {
        &self.pg_client
    }

    /// Returns the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Returns the search cache.
    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    /// Returns the ingest pipeline.
    pub fn ingest(&self) -> &IngestPipeline {
        &self.ingest
    }

    /// Returns the batch scheduler.
    pub fn batch(&self) -> &BatchScheduler {
        &self.batch
    }

    /// Returns the retrieval engine.
    pub fn retrieval(&self) -> &RetrievalEngine {
        &self.retrieval
    }

    /// Returns the sync core.
    pub fn sync(&self) -> &SyncCore {
        &self.sync
    }

    /// Returns the vision analyzer, when configured.
    pub fn vision(&self) -> Option<&Arc<dyn VisionAnalyzer>> {
        self.vision.as_ref()
    }

    /// Returns the blob store.
    pub fn blob_store(&self) -> &BlobStore {
        &self.blob_store
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+ $(,)?) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(pg_client: PgClient);
impl_di!(blob_store: BlobStore);
impl_di!(events: EventBus);
impl_di!(cache: SearchCache);
impl_di!(batch: BatchScheduler);
