use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use thiserror::Error;

use self::{file::FileStorage, memory::MemoryStorage};

pub mod file;
pub mod memory;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unable to initialize persistence: {0}")]
    UnableToInitializePersistence(anyhow::Error),

    #[error("Unable to reset persistence: {0}")]
    UnableToResetPersistence(anyhow::Error),

    #[error("Unable to write blob: {0}")]
    UnableToWriteBlob(anyhow::Error),

    #[error("Unable to read blob: {0}")]
    UnableToReadBlob(anyhow::Error),

    #[error("Unable to serialize data: {0}")]
    UnableToSerialize(anyhow::Error),

    #[error("Storage lock was poisoned by a panicking writer")]
    LockPoisoned,
}

pub type StorageResult<T> = Result<T, StorageError>;

pub fn io_to_generic_error(error: std::io::Error) -> anyhow::Error {
    anyhow::Error::new(error)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadBlobState {
    Found(Vec<u8>),
    NotFound,
}

/// Key-value slots holding whole blobs. Every write replaces the slot.
pub trait Storage {
    /// Called when the store opens, should be idempotent
    fn init(&self) -> StorageResult<()>;

    /// Removes every slot
    fn reset(&self) -> StorageResult<()>;

    fn write_blob(&self, path: &str, bytes: Vec<u8>) -> StorageResult<()>;

    fn read_blob(&self, path: &str) -> StorageResult<ReadBlobState>;
}

pub type SharedStorage = Arc<Mutex<dyn Storage + Sync + Send>>;

#[derive(Debug, Clone, PartialEq)]
pub enum StorageEngine {
    /// One JSON file per slot inside the directory
    File(PathBuf),
    /// Lives as long as the store, nothing reaches disk
    Memory,
}

impl StorageEngine {
    pub fn get_engine(&self) -> SharedStorage {
        match self {
            StorageEngine::File(path) => Arc::new(Mutex::new(FileStorage::new(path.clone()))),
            StorageEngine::Memory => Arc::new(Mutex::new(MemoryStorage::new())),
        }
    }

    pub fn get_engine_info_stats(&self) -> Vec<(String, String)> {
        match self {
            StorageEngine::File(path) => vec![
                ("StorageEngine".to_string(), "File".to_string()),
                ("DataDirectory".to_string(), path.display().to_string()),
            ],
            StorageEngine::Memory => {
                vec![("StorageEngine".to_string(), "Memory".to_string())]
            }
        }
    }
}
