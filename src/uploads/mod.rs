//! Course material uploads.
//!
//! Items are created `Queued` on selection, become `Processing` once the
//! upload endpoint accepts them, and a local timer marks them `Ready`.

pub mod board;
pub mod queue;
pub mod types;

pub use board::{MaterialsBoard, UploadBackend, UploadOutcome};
pub use queue::{FAILED_MESSAGE, UPLOADED_MESSAGE, UploadBatch, UploadQueue};
pub use types::{UploadError, UploadItem, UploadStatus};
