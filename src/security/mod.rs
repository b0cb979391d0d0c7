//! Input sanitization and fail-silent client storage.

pub mod preferences;
pub mod sanitize;
pub mod storage;

pub use preferences::{Consent, CookieChoice, Preferences};
pub use sanitize::sanitize_input;
pub use storage::{
    DisabledBackend, FileBackend, KeyValueBackend, MemoryBackend, SafeStorage, StorageError,
    StorageResult,
};
