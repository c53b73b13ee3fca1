use std::path::PathBuf;

use crate::{model::employee::NewEmployee, persistence::storage::StorageEngine};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub restore: bool,
    pub storage_engine: StorageEngine,
    pub seed_roster: Vec<NewEmployee>,
}

// Implements: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
impl StoreOptions {
    /// Defines whether we should load the persisted roster when the store opens
    pub fn set_restore(mut self, restore: bool) -> Self {
        self.restore = restore;
        self
    }

    pub fn set_storage_engine(mut self, storage_engine: StorageEngine) -> Self {
        self.storage_engine = storage_engine;
        self
    }

    /// Roster used when nothing (or nothing readable) has been persisted yet.
    /// Seeds are only written once the roster is first mutated.
    pub fn set_seed_roster(mut self, seed_roster: Vec<NewEmployee>) -> Self {
        self.seed_roster = seed_roster;
        self
    }

    pub fn set_data_directory(self, data_directory: PathBuf) -> Self {
        self.set_storage_engine(StorageEngine::File(data_directory))
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        // Defaults to $CWD/data
        Self {
            restore: true,
            storage_engine: StorageEngine::File(PathBuf::from("data")),
            seed_roster: vec![],
        }
    }
}

#[cfg(test)]
impl StoreOptions {
    pub fn new_test() -> Self {
        use uuid::Uuid;

        let database_dir: PathBuf = ["/", "tmp", "birthdays", &Uuid::new_v4().to_string()]
            .iter()
            .collect();

        StoreOptions::default().set_data_directory(database_dir)
    }
}
