//! Token persistence layer
//!
//! Provides save/load functionality for the token state.

use crate::token::{Token, TokenError};
use std::fs::{self, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the lock file guarding a data directory
pub const LOCK_FILE: &str = ".lock";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Corrupted ledger: {0}")]
    Token(#[from] TokenError),
    #[error("Data directory in use by another process (remove {0:?} if it is stale)")]
    Locked(PathBuf),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub token_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".bond_token_data"),
            token_file: "token.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Exclusive claim on a data directory, released on drop
///
/// Only one host (CLI invocation or API server) may hold a token's data
/// directory at a time, otherwise the last writer silently wins.
#[derive(Debug)]
pub struct DataDirLock {
    path: PathBuf,
}

impl DataDirLock {
    /// Claim `data_dir`, failing with `Locked` if another process holds it
    pub fn acquire(data_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(LOCK_FILE);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                log::debug!("Acquired lock {:?}", path);
                Ok(Self { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StorageError::Locked(path)),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the lock file now; for shutdown paths that never reach drop
    pub fn release(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Failed to remove lock {:?}: {}", self.path, e);
            }
        }
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Token storage manager
#[derive(Debug)]
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Get the token file path
    fn token_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.token_file)
    }

    /// Get a backup file path
    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.token_file, index))
    }

    /// Save the token to disk
    ///
    /// The new state is fully written and synced to a temporary file before
    /// it replaces the current one, so a failed write never clobbers good
    /// state.
    pub fn save(&self, token: &Token) -> Result<(), StorageError> {
        let path = self.token_path();

        // Write to temporary file first
        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.token_file));
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, token)?;
        writer.flush()?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        // Create backup if enabled
        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        log::debug!("Saved token state to {:?}", path);
        Ok(())
    }

    /// Load the token from disk, refusing state that breaks the ledger
    /// invariants
    pub fn load(&self) -> Result<Token, StorageError> {
        let path = self.token_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Token file not found".to_string(),
            ));
        }

        let token = load_from_file(&path)?;
        log::debug!(
            "Loaded token {} with {} events",
            token.symbol(),
            token.events().len()
        );
        Ok(token)
    }

    /// Check if a saved token exists
    pub fn exists(&self) -> bool {
        self.token_path().exists()
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                let next = self.backup_path(i + 1);
                fs::rename(&current, &next)?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<Token, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        let token = load_from_file(&backup_path)?;
        log::warn!("Restored token state from backup {}", backup_index);
        Ok(token)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

/// Load token state from a specific file path
pub fn load_from_file(path: &Path) -> Result<Token, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let token: Token = serde_json::from_reader(reader)?;
    token.check_invariants()?;
    Ok(token)
}
