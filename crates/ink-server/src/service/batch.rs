//! Batch scheduler for folder-scale media ingestion.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use ink_core::vision::DetailLevel;
use ink_postgres::types::BatchStatus;
use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::ingest::{IngestPipeline, MediaIngest};
use super::{BatchConfig, ServiceError, ServiceResult};

/// Tracing target for batch operations.
const TRACING_TARGET: &str = "ink_server::service::batch";

/// File extensions accepted when expanding a folder.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tiff"];

/// One unit of work in a batch.
#[derive(Debug, Clone)]
pub enum BatchItem {
    /// A file on the gateway's filesystem.
    Path(PathBuf),
    /// Inline bytes shipped with the request.
    Inline {
        /// Original file name.
        file_name: String,
        /// Raw content.
        data: Bytes,
    },
}

impl BatchItem {
    fn display_name(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Inline { file_name, .. } => file_name.clone(),
        }
    }
}

/// Options shared by every unit of a batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Owning page for every ingested chunk.
    pub page: Option<Uuid>,
    /// Tags attached to every ingested chunk.
    pub tags: Vec<Uuid>,
    /// Whether units run vision analysis.
    pub auto_analyze: bool,
    /// Whether units compute embeddings.
    pub auto_embed: bool,
    /// Parallel units; clamped to the configured maximum.
    pub concurrency: Option<usize>,
    /// Description language for analysis.
    pub language: String,
    /// Analysis detail level.
    pub detail: DetailLevel,
}

/// A recorded per-unit failure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchError {
    /// The failing unit.
    pub file: String,
    /// Failure description.
    pub message: String,
    /// Whether retrying this unit may succeed.
    pub recoverable: bool,
}

/// A recorded per-unit success.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchUnitResult {
    /// The processed unit.
    pub file: String,
    /// The stored (or reused) chunk.
    pub chunk_id: Uuid,
    /// Whether the unit resolved to an existing chunk.
    pub deduplicated: bool,
}

/// Observable state of a batch job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchJob {
    /// Job id.
    pub id: Uuid,
    /// Total units.
    pub total: usize,
    /// Units finished (successful or failed).
    pub processed: usize,
    /// Successful units.
    pub successful: usize,
    /// Failed units.
    pub failed: usize,
    /// Per-unit failures.
    pub errors: Vec<BatchError>,
    /// Lifecycle state.
    pub status: BatchStatus,
    /// When the job was accepted.
    pub started_at: Timestamp,
    /// When the job reached a terminal state.
    pub ended_at: Option<Timestamp>,
    /// Per-unit successes.
    pub results: Vec<BatchUnitResult>,
}

struct JobControl {
    cancel: CancellationToken,
    pause: watch::Sender<bool>,
}

/// Coordinates folder-scale ingests with bounded concurrency.
#[derive(Clone)]
pub struct BatchScheduler {
    pipeline: Arc<IngestPipeline>,
    config: BatchConfig,
    jobs: Arc<RwLock<HashMap<Uuid, BatchJob>>>,
    controls: Arc<RwLock<HashMap<Uuid, JobControl>>>,
}

impl BatchScheduler {
    /// Creates the scheduler.
    pub fn new(pipeline: Arc<IngestPipeline>, config: BatchConfig) -> Self {
        Self {
            pipeline,
            config,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            controls: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Starts a batch over explicit items and/or a folder.
    ///
    /// Returns the immediately-visible job id; processing happens on a
    /// background task.
    pub async fn start_batch(
        &self,
        mut items: Vec<BatchItem>,
        folder: Option<PathBuf>,
        options: BatchOptions,
    ) -> ServiceResult<Uuid> {
        let concurrency = options
            .concurrency
            .unwrap_or(self.config.default_concurrency);
        if concurrency == 0 || concurrency > self.config.max_concurrency {
            return Err(ServiceError::validation(format!(
                "concurrency must be between 1 and {}",
                self.config.max_concurrency
            )));
        }

        if let Some(folder) = folder {
            items.extend(expand_folder(&folder).await?);
        }
        if items.is_empty() {
            return Err(ServiceError::validation("batch contains no files"));
        }

        let job_id = Uuid::now_v7();
        let job = BatchJob {
            id: job_id,
            total: items.len(),
            processed: 0,
            successful: 0,
            failed: 0,
            errors: vec![],
            status: BatchStatus::Queued,
            started_at: Timestamp::now(),
            ended_at: None,
            results: vec![],
        };

        let cancel = CancellationToken::new();
        let (pause, _) = watch::channel(false);

        self.jobs.write().await.insert(job_id, job);
        self.controls.write().await.insert(
            job_id,
            JobControl {
                cancel: cancel.clone(),
                pause: pause.clone(),
            },
        );

        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler
                .run_job(job_id, items, options, concurrency, cancel, pause.subscribe())
                .await;
        });

        tracing::info!(
            target: TRACING_TARGET,
            job_id = %job_id,
            concurrency = concurrency,
            "Batch job accepted"
        );

        Ok(job_id)
    }

    /// Returns a snapshot of a job.
    pub async fn job(&self, job_id: Uuid) -> ServiceResult<BatchJob> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("batch job", job_id))
    }

    /// Pauses dispatching of new units.
    pub async fn pause(&self, job_id: Uuid) -> ServiceResult<()> {
        self.set_paused(job_id, true).await?;
        self.set_status_if_running(job_id, BatchStatus::Paused).await;
        Ok(())
    }

    /// Resumes a paused job.
    pub async fn resume(&self, job_id: Uuid) -> ServiceResult<()> {
        self.set_paused(job_id, false).await?;
        self.set_status_if(job_id, BatchStatus::Paused, BatchStatus::Running)
            .await;
        Ok(())
    }

    /// Cancels a job: no new units launch, in-flight units are awaited
    /// within the configured grace window.
    pub async fn cancel(&self, job_id: Uuid) -> ServiceResult<()> {
        let controls = self.controls.read().await;
        let control = controls
            .get(&job_id)
            .ok_or_else(|| ServiceError::not_found("batch job", job_id))?;
        control.cancel.cancel();
        // a paused job would otherwise never observe the cancellation
        let _ = control.pause.send(false);
        Ok(())
    }

    async fn set_paused(&self, job_id: Uuid, paused: bool) -> ServiceResult<()> {
        let controls = self.controls.read().await;
        let control = controls
            .get(&job_id)
            .ok_or_else(|| ServiceError::not_found("batch job", job_id))?;
        let _ = control.pause.send(paused);
        Ok(())
    }

    async fn set_status_if_running(&self, job_id: Uuid, status: BatchStatus) {
        self.set_status_if(job_id, BatchStatus::Running, status).await;
        self.set_status_if(job_id, BatchStatus::Queued, status).await;
    }

    async fn set_status_if(&self, job_id: Uuid, expected: BatchStatus, status: BatchStatus) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            if job.status == expected {
                job.status = status;
            }
        }
    }

    async fn run_job(
        &self,
        job_id: Uuid,
        items: Vec<BatchItem>,
        options: BatchOptions,
        concurrency: usize,
        cancel: CancellationToken,
        mut paused: watch::Receiver<bool>,
    ) {
        self.set_status_if(job_id, BatchStatus::Queued, BatchStatus::Running)
            .await;

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            // honour pause before launching the next unit
            while *paused.borrow() && !cancel.is_cancelled() {
                if paused.changed().await.is_err() {
                    break;
                }
            }

            if cancel.is_cancelled() {
                break;
            }

            let permit = tokio::select! {
                biased;

                () = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let scheduler = self.clone();
            let options = options.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                scheduler.run_unit(job_id, item, options).await;
            }));
        }

        let cancelled = cancel.is_cancelled();

        // wait for in-flight units, bounded by the shutdown grace window
        // when the job was cancelled
        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if cancelled {
            let _ = tokio::time::timeout(self.config.shutdown_grace(), drain).await;
        } else {
            drain.await;
        }

        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&job_id) {
            job.status = if cancelled {
                BatchStatus::Cancelled
            } else if job.failed > 0 && job.successful == 0 {
                BatchStatus::Failed
            } else {
                BatchStatus::Completed
            };
            job.ended_at = Some(Timestamp::now());

            tracing::info!(
                target: TRACING_TARGET,
                job_id = %job_id,
                status = %job.status,
                processed = job.processed,
                failed = job.failed,
                "Batch job finished"
            );
        }
        drop(jobs);

        self.controls.write().await.remove(&job_id);
    }

    async fn run_unit(&self, job_id: Uuid, item: BatchItem, options: BatchOptions) {
        let name = item.display_name();
        let outcome = self.ingest_item(item, &options).await;

        // progress counters update atomically after every completed unit
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            return;
        };

        job.processed += 1;
        match outcome {
            Ok((chunk_id, deduplicated)) => {
                job.successful += 1;
                job.results.push(BatchUnitResult {
                    file: name,
                    chunk_id,
                    deduplicated,
                });
            }
            Err(error) => {
                job.failed += 1;
                tracing::warn!(
                    target: TRACING_TARGET,
                    job_id = %job_id,
                    file = %name,
                    error = %error,
                    "Batch unit failed"
                );
                job.errors.push(BatchError {
                    file: name,
                    message: error.to_string(),
                    recoverable: error.is_recoverable(),
                });
            }
        }
    }

    async fn ingest_item(
        &self,
        item: BatchItem,
        options: &BatchOptions,
    ) -> ServiceResult<(Uuid, bool)> {
        let (file_name, data) = match item {
            BatchItem::Inline { file_name, data } => (file_name, data),
            BatchItem::Path(path) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let data = tokio::fs::read(&path).await.map_err(|e| {
                    ServiceError::validation(format!("cannot read {}: {e}", path.display()))
                })?;
                (file_name, Bytes::from(data))
            }
        };

        let outcome = self
            .pipeline
            .ingest_media(MediaIngest {
                data,
                file_name,
                page: options.page,
                tags: options.tags.clone(),
                auto_analyze: options.auto_analyze,
                auto_embed: options.auto_embed,
                language: options.language.clone(),
                detail: options.detail,
            })
            .await?;

        Ok((outcome.chunk.id, outcome.deduplicated))
    }
}

/// Expands a folder into batch items, keeping only image files.
async fn expand_folder(folder: &PathBuf) -> ServiceResult<Vec<BatchItem>> {
    let mut entries = tokio::fs::read_dir(folder).await.map_err(|e| {
        ServiceError::validation(format!("cannot read folder {}: {e}", folder.display()))
    })?;

    let mut items = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| {
        ServiceError::internal(format!("folder listing failed: {e}"))
    })? {
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_image {
            items.push(BatchItem::Path(path));
        }
    }

    items.sort_by_key(|item| item.display_name());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ink_core::mock::{MockEmbedder, MockVision};
    use ink_opendal::{BlobStore, FsConfig, StorageConfig};
    use ink_postgres::{PgClient, PgConfig};

    use super::*;
    use crate::service::cache::SearchCache;
    use crate::service::{CacheConfig, EventBus};

    fn test_scheduler(blob_root: &std::path::Path) -> BatchScheduler {
        let pg = PgClient::new(PgConfig::default()).unwrap();
        let blobs = BlobStore::new(StorageConfig::Fs(FsConfig {
            root: blob_root.to_string_lossy().into_owned(),
        }))
        .unwrap();
        let events = EventBus::new();
        let cache = SearchCache::new(pg.clone(), CacheConfig::default(), events.clone());
        let embedder = Arc::new(MockEmbedder::new(512));

        let pipeline = Arc::new(IngestPipeline::new(
            pg,
            blobs,
            embedder.clone(),
            embedder,
            Some(Arc::new(MockVision::new())),
            events,
            cache,
        ));
        BatchScheduler::new(pipeline, BatchConfig::default())
    }

    fn options() -> BatchOptions {
        BatchOptions {
            page: None,
            tags: vec![],
            auto_analyze: false,
            auto_embed: false,
            concurrency: Some(2),
            language: "en".into(),
            detail: DetailLevel::Medium,
        }
    }

    async fn wait_terminal(scheduler: &BatchScheduler, job_id: Uuid) -> BatchJob {
        for _ in 0..500 {
            let job = scheduler.job(job_id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("batch job never reached a terminal state");
    }

    #[tokio::test]
    async fn failing_units_are_recorded_per_unit() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = test_scheduler(dir.path());

        let items = (0..3)
            .map(|i| BatchItem::Path(PathBuf::from(format!("/nonexistent/img-{i}.png"))))
            .collect();
        let job_id = scheduler.start_batch(items, None, options()).await.unwrap();

        // the id is visible immediately
        assert!(scheduler.job(job_id).await.is_ok());

        let job = wait_terminal(&scheduler, job_id).await;
        assert_eq!(job.total, 3);
        assert_eq!(job.processed, 3);
        assert_eq!(job.failed, 3);
        assert_eq!(job.status, BatchStatus::Failed);
        assert!(job.ended_at.is_some());
        // unreadable files are caller errors, not worth retrying
        assert!(job.errors.iter().all(|e| !e.recoverable));
    }

    #[tokio::test]
    async fn concurrency_bounds_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = test_scheduler(dir.path());

        let items = vec![BatchItem::Path(PathBuf::from("/nonexistent/a.png"))];
        let mut opts = options();
        opts.concurrency = Some(0);
        assert!(scheduler.start_batch(items.clone(), None, opts).await.is_err());

        let mut opts = options();
        opts.concurrency = Some(999);
        assert!(scheduler.start_batch(items, None, opts).await.is_err());
    }

    #[tokio::test]
    async fn empty_batches_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = test_scheduler(dir.path());

        assert!(scheduler.start_batch(vec![], None, options()).await.is_err());
    }

    #[tokio::test]
    async fn controls_vanish_after_completion() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = test_scheduler(dir.path());

        let items = vec![BatchItem::Path(PathBuf::from("/nonexistent/a.png"))];
        let job_id = scheduler.start_batch(items, None, options()).await.unwrap();
        let _ = wait_terminal(&scheduler, job_id).await;

        // the job stays queryable, its controls do not
        assert!(scheduler.job(job_id).await.is_ok());
        assert!(scheduler.cancel(job_id).await.is_err());
        assert!(scheduler.pause(job_id).await.is_err());
    }

    #[tokio::test]
    async fn unknown_jobs_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = test_scheduler(dir.path());

        let missing = Uuid::now_v7();
        assert!(scheduler.job(missing).await.is_err());
        assert!(scheduler.cancel(missing).await.is_err());
        assert!(scheduler.resume(missing).await.is_err());
    }

    #[test]
    fn display_names() {
        let inline = BatchItem::Inline {
            file_name: "cats.png".into(),
            data: Bytes::new(),
        };
        assert_eq!(inline.display_name(), "cats.png");

        let path = BatchItem::Path(PathBuf::from("/srv/images/dogs.jpg"));
        assert_eq!(path.display_name(), "/srv/images/dogs.jpg");
    }

    #[tokio::test]
    async fn folder_expansion_filters_images() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.png"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("b.txt"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("c.JPG"), b"x").await.unwrap();

        let items = expand_folder(&dir.path().to_path_buf()).await.unwrap();
        let names: Vec<String> = items.iter().map(BatchItem::display_name).collect();

        assert_eq!(items.len(), 2);
        assert!(names.iter().any(|n| n.ends_with("a.png")));
        assert!(names.iter().any(|n| n.ends_with("c.JPG")));
    }
}
