//! Shared upload queue driven by the upload endpoint and a processing timer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::{ApiClient, FileDescriptor, RequestFailed, UploadReceipt};
use crate::config::UploadConfig;

use super::queue::UploadQueue;
use super::types::{UploadError, UploadItem};

/// Sends a batch of file descriptors.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Perform a single attempt.
    ///
    /// # Errors
    /// Returns the normalized request failure.
    async fn upload(&self, files: &[FileDescriptor]) -> Result<UploadReceipt, RequestFailed>;
}

#[async_trait]
impl UploadBackend for ApiClient {
    async fn upload(&self, files: &[FileDescriptor]) -> Result<UploadReceipt, RequestFailed> {
        Self::upload(self, files).await
    }
}

/// Result of [`MaterialsBoard::upload`].
#[derive(Debug)]
pub enum UploadOutcome {
    /// Server accepted the batch; the handle resolves once it is ready.
    Accepted {
        /// Count reported by the server.
        received: usize,
        /// Timer task flipping the batch to ready.
        processing: JoinHandle<()>,
    },
    /// Request failed; items stay queued.
    Failed(RequestFailed),
}

/// Materials panel state shared with its processing timer.
#[derive(Clone, Debug)]
pub struct MaterialsBoard {
    queue: Arc<RwLock<UploadQueue>>,
    processing_delay: Duration,
}

impl MaterialsBoard {
    /// Empty board.
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            queue: Arc::new(RwLock::new(UploadQueue::new(config))),
            processing_delay: config.processing_delay,
        }
    }

    /// Queue selected files.
    ///
    /// # Errors
    /// See [`UploadQueue::select`].
    pub async fn select(&self, files: Vec<FileDescriptor>) -> Result<usize, UploadError> {
        self.queue.write().await.select(files)
    }

    /// Whether `name` would be accepted by [`MaterialsBoard::select`].
    pub async fn accepts(&self, name: &str) -> bool {
        self.queue.read().await.accepts(name)
    }

    /// Copy of the current items, newest first.
    pub async fn items(&self) -> Vec<UploadItem> {
        self.queue.read().await.items().to_vec()
    }

    /// Current status line.
    pub async fn status_message(&self) -> Option<String> {
        self.queue.read().await.status_message().map(ToString::to_string)
    }

    /// Send every queued item and schedule the move to ready on success.
    ///
    /// # Errors
    /// Returns [`UploadError`] if nothing is queued or a batch is in flight.
    pub async fn upload<B>(&self, backend: &B) -> Result<UploadOutcome, UploadError>
    where
        B: UploadBackend + ?Sized,
    {
        let batch = self.queue.write().await.begin_upload()?;
        let result = backend.upload(&batch.files).await;
        self.queue.write().await.complete_upload(&batch, &result);

        match result {
            Ok(receipt) => Ok(UploadOutcome::Accepted {
                received: receipt.received,
                processing: self.schedule_ready(batch.ids),
            }),
            Err(err) => Ok(UploadOutcome::Failed(err)),
        }
    }

    fn schedule_ready(&self, ids: Vec<String>) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let delay = self.processing_delay;
        debug!(?delay, count = ids.len(), "processing timer started");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let ready = queue.write().await.mark_ready(&ids);
            info!(ready, "uploads ready");
        })
    }
}
