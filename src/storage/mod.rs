//! On-disk log file lifecycle: lazy directory creation, append, rotation,
//! listing and age-based retention. Owned exclusively by the logger worker.

pub mod file_store;

pub use file_store::{DEFAULT_FILE_PREFIX, LOG_FILE_EXTENSION, LogFileStore};
