//! Upload selection and the optimistic send/reconcile cycle.

use std::path::Path;

use tracing::debug;

use crate::api::{FileDescriptor, RequestFailed, UploadReceipt};
use crate::config::UploadConfig;

use super::types::{UploadError, UploadItem, UploadStatus};

/// Status line after a successful upload.
pub const UPLOADED_MESSAGE: &str = "Uploaded. Processing may take a moment.";
/// Status line after a failed upload.
pub const FAILED_MESSAGE: &str = "Upload failed.";

/// Files handed to one upload request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use = "pass the batch to UploadQueue::complete_upload"]
pub struct UploadBatch {
    /// Ids of the queued items in the batch.
    pub ids: Vec<String>,
    /// Payload for the upload endpoint.
    pub files: Vec<FileDescriptor>,
}

/// Uploaded items, newest first, plus the panel's busy flag and status line.
#[derive(Clone, Debug)]
pub struct UploadQueue {
    items: Vec<UploadItem>,
    accepted: Vec<String>,
    status_message: Option<String>,
    busy: bool,
}

impl UploadQueue {
    /// Empty queue accepting the configured extensions.
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            items: Vec::new(),
            accepted: config
                .accepted_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            status_message: None,
            busy: false,
        }
    }

    /// Whether `name` carries an accepted extension (case-insensitive).
    #[must_use]
    pub fn accepts(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.accepted
                    .iter()
                    .any(|accepted| accepted.eq_ignore_ascii_case(ext))
            })
    }

    /// Queue the accepted subset of `files`. Returns how many were queued.
    ///
    /// # Errors
    /// Returns [`UploadError::NoSupportedFiles`] if none are accepted; the
    /// queue is left untouched.
    pub fn select(&mut self, files: Vec<FileDescriptor>) -> Result<usize, UploadError> {
        let accepted: Vec<UploadItem> = files
            .into_iter()
            .filter(|file| self.accepts(&file.name))
            .map(UploadItem::queued)
            .collect();

        if accepted.is_empty() {
            return Err(UploadError::NoSupportedFiles(self.accepted.join(", ")));
        }

        let count = accepted.len();
        self.items.splice(0..0, accepted);
        debug!(count, "files queued");
        Ok(count)
    }

    /// Mark every queued item as in flight and return the batch.
    ///
    /// # Errors
    /// Returns [`UploadError::Busy`] while a batch is in flight, or
    /// [`UploadError::NothingQueued`] when no item is queued.
    pub fn begin_upload(&mut self) -> Result<UploadBatch, UploadError> {
        if self.busy {
            return Err(UploadError::Busy);
        }

        let queued: Vec<&UploadItem> = self
            .items
            .iter()
            .filter(|item| item.status == UploadStatus::Queued)
            .collect();
        if queued.is_empty() {
            return Err(UploadError::NothingQueued);
        }

        let batch = UploadBatch {
            ids: queued.iter().map(|item| item.id.clone()).collect(),
            files: queued.iter().map(|item| item.descriptor()).collect(),
        };
        self.busy = true;
        self.status_message = None;
        Ok(batch)
    }

    /// Apply the result of a batch. Returns whether the upload succeeded.
    pub fn complete_upload(
        &mut self,
        batch: &UploadBatch,
        result: &Result<UploadReceipt, RequestFailed>,
    ) -> bool {
        self.busy = false;

        match result {
            Ok(receipt) => {
                debug!(sent = batch.ids.len(), received = receipt.received, "upload accepted");
                self.advance(&batch.ids, UploadStatus::Processing);
                self.status_message = Some(UPLOADED_MESSAGE.to_string());
                true
            }
            Err(err) => {
                debug!(error = %err, "upload failed, items stay queued");
                self.status_message = Some(FAILED_MESSAGE.to_string());
                false
            }
        }
    }

    /// Move processing items among `ids` to ready. Returns how many moved.
    pub fn mark_ready(&mut self, ids: &[String]) -> usize {
        self.advance(ids, UploadStatus::Ready)
    }

    fn advance(&mut self, ids: &[String], next: UploadStatus) -> usize {
        self.items
            .iter_mut()
            .filter(|item| ids.contains(&item.id))
            .map(|item| item.advance_to(next))
            .filter(|moved| *moved)
            .count()
    }

    /// Items, newest first.
    #[must_use]
    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    /// Last status line, if any.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Whether a batch is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }
}

impl Default for UploadQueue {
    fn default() -> Self {
        Self::new(&UploadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<FileDescriptor> {
        names
            .iter()
            .map(|name| FileDescriptor::new(*name, 1024))
            .collect()
    }

    #[test]
    fn test_select_filters_by_extension() {
        let mut queue = UploadQueue::default();
        let count = queue
            .select(files(&["lecture.PDF", "photo.png", "notes.md", "README"]))
            .unwrap();

        assert_eq!(count, 2);
        let names: Vec<&str> = queue.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["lecture.PDF", "notes.md"]);
        assert!(queue.items().iter().all(|i| i.status == UploadStatus::Queued));
    }

    #[test]
    fn test_select_nothing_supported_leaves_queue_untouched() {
        let mut queue = UploadQueue::default();
        let err = queue.select(files(&["a.png", "b.exe"])).unwrap_err();
        assert!(matches!(err, UploadError::NoSupportedFiles(_)));
        assert!(queue.items().is_empty());
    }

    #[test]
    fn test_newer_selection_goes_first() {
        let mut queue = UploadQueue::default();
        queue.select(files(&["old.pdf"])).unwrap();
        queue.select(files(&["new.pdf"])).unwrap();
        assert_eq!(queue.items()[0].name, "new.pdf");
    }

    #[test]
    fn test_success_moves_batch_to_processing_then_ready() {
        let mut queue = UploadQueue::default();
        queue.select(files(&["a.pdf", "b.ppt"])).unwrap();

        let batch = queue.begin_upload().unwrap();
        assert!(queue.is_busy());
        assert_eq!(batch.files.len(), 2);
        assert_eq!(queue.begin_upload().unwrap_err(), UploadError::Busy);

        let ok = queue.complete_upload(&batch, &Ok(UploadReceipt { ok: true, received: 2 }));
        assert!(ok);
        assert!(!queue.is_busy());
        assert_eq!(queue.status_message(), Some(UPLOADED_MESSAGE));
        assert!(queue.items().iter().all(|i| i.status == UploadStatus::Processing));

        assert_eq!(queue.mark_ready(&batch.ids), 2);
        assert_eq!(queue.mark_ready(&batch.ids), 0);
        assert!(queue.items().iter().all(|i| i.status == UploadStatus::Ready));
        assert_eq!(queue.begin_upload().unwrap_err(), UploadError::NothingQueued);
    }

    #[test]
    fn test_failure_keeps_items_queued() {
        let mut queue = UploadQueue::default();
        queue.select(files(&["a.pdf"])).unwrap();

        let batch = queue.begin_upload().unwrap();
        let failure = Err(RequestFailed::http("/api/upload", 500, String::new()));
        assert!(!queue.complete_upload(&batch, &failure));

        assert_eq!(queue.status_message(), Some(FAILED_MESSAGE));
        assert_eq!(queue.items()[0].status, UploadStatus::Queued);
        assert!(queue.begin_upload().is_ok());
    }

    #[test]
    fn test_custom_extensions() {
        let config = UploadConfig {
            accepted_extensions: vec![".PDF".to_string()],
            ..UploadConfig::default()
        };
        let queue = UploadQueue::new(&config);
        assert!(queue.accepts("x.pdf"));
        assert!(!queue.accepts("x.md"));
    }
}
