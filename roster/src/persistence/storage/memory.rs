use std::{collections::HashMap, sync::Mutex};

use super::{ReadBlobState, Storage, StorageError, StorageResult};

#[derive(Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_blobs<T>(&self, f: impl FnOnce(&mut HashMap<String, Vec<u8>>) -> T) -> StorageResult<T> {
        let mut blobs = self.blobs.lock().map_err(|_| StorageError::LockPoisoned)?;

        Ok(f(&mut blobs))
    }
}

impl Storage for MemoryStorage {
    fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    fn reset(&self) -> StorageResult<()> {
        self.with_blobs(|blobs| blobs.clear())
    }

    fn write_blob(&self, path: &str, bytes: Vec<u8>) -> StorageResult<()> {
        self.with_blobs(|blobs| {
            blobs.insert(path.to_string(), bytes);
        })
    }

    fn read_blob(&self, path: &str) -> StorageResult<ReadBlobState> {
        self.with_blobs(|blobs| match blobs.get(path) {
            Some(bytes) => ReadBlobState::Found(bytes.clone()),
            None => ReadBlobState::NotFound,
        })
    }
}
