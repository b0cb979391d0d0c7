//! Upload records and their lifecycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::FileDescriptor;

/// Where an upload is in its (simulated) pipeline.
///
/// Variants are ordered; an item only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UploadStatus {
    /// Selected, not yet sent.
    Queued,
    /// Accepted by the server, awaiting processing.
    Processing,
    /// Usable as course material.
    Ready,
}

/// A selected file tracked by the materials board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadItem {
    /// Local identifier.
    pub id: String,
    /// File name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Lifecycle stage.
    pub status: UploadStatus,
}

impl UploadItem {
    /// New queued item for a selected file.
    #[must_use]
    pub fn queued(file: FileDescriptor) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: file.name,
            size: file.size,
            status: UploadStatus::Queued,
        }
    }

    /// Move to `next` if that is a forward step. Returns whether it moved.
    pub fn advance_to(&mut self, next: UploadStatus) -> bool {
        if next > self.status {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Size rounded to whole kilobytes, as shown in listings.
    #[must_use]
    pub fn size_kb(&self) -> u64 {
        self.size / 1024 + u64::from(self.size % 1024 >= 512)
    }

    /// Descriptor sent to the upload endpoint.
    #[must_use]
    pub fn descriptor(&self) -> FileDescriptor {
        FileDescriptor::new(self.name.clone(), self.size)
    }
}

/// Reasons an upload action is refused.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    /// None of the selected files has an accepted extension.
    #[error("no supported files; accepted: {0}")]
    NoSupportedFiles(String),
    /// There is nothing queued to send.
    #[error("no files queued for upload")]
    NothingQueued,
    /// An upload is already in flight.
    #[error("an upload is already in progress")]
    Busy,
}
