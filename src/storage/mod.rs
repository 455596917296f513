//! Storage module for token persistence

pub mod persistence;

pub use persistence::{load_from_file, DataDirLock, Storage, StorageConfig, StorageError, LOCK_FILE};
