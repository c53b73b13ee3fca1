use std::{
    collections::HashSet,
    sync::{Arc, MutexGuard},
};

use serde::Serialize;
use serde_json::Value;

use crate::{
    consts::consts::{EMPLOYEES_SLOT, SNAPSHOT_VERSION},
    diagnostics::{Diagnostic, DiagnosticSink},
    model::employee::Employee,
};

use super::storage::{ReadBlobState, SharedStorage, Storage, StorageError, StorageResult};

#[derive(Serialize)]
struct RosterSnapshot<'a> {
    version: u32,
    employees: &'a [Employee],
}

/// Outcome of reading the employee slot
#[derive(Debug, Clone, PartialEq)]
pub enum RestoredRoster {
    NotFound,
    Found(Vec<Employee>),
    /// Payload exists but could not be understood, carries the reason
    Corrupt(String),
}

impl RestoredRoster {
    pub fn into_employees(self) -> Vec<Employee> {
        match self {
            RestoredRoster::Found(employees) => employees,
            RestoredRoster::NotFound | RestoredRoster::Corrupt(_) => vec![],
        }
    }
}

/// Reads and writes the full roster to a single storage slot
pub struct SnapshotManager {
    storage: SharedStorage,
    sink: Arc<dyn DiagnosticSink>,
}

impl SnapshotManager {
    pub fn new(storage: SharedStorage, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { storage, sink }
    }

    pub fn init(&self) -> StorageResult<()> {
        self.lock()?.init()
    }

    pub fn reset(&self) -> StorageResult<()> {
        self.lock()?.reset()
    }

    /// Never fails, unreadable data is reported to the sink and loads as empty
    pub fn load(&self) -> Vec<Employee> {
        self.restore().into_employees()
    }

    #[tracing::instrument(skip(self))]
    pub fn restore(&self) -> RestoredRoster {
        let read = self.lock().and_then(|storage| storage.read_blob(EMPLOYEES_SLOT));

        let bytes = match read {
            Ok(ReadBlobState::Found(bytes)) => bytes,
            Ok(ReadBlobState::NotFound) => return RestoredRoster::NotFound,
            Err(err) => {
                let reason = err.to_string();
                self.report_corrupt(&reason);
                return RestoredRoster::Corrupt(reason);
            }
        };

        match self.decode(&bytes) {
            Ok(employees) => RestoredRoster::Found(employees),
            Err(reason) => {
                self.report_corrupt(&reason);
                RestoredRoster::Corrupt(reason)
            }
        }
    }

    #[tracing::instrument(skip(self, employees), fields(employees = employees.len()))]
    pub fn save(&self, employees: &[Employee]) -> StorageResult<()> {
        let snapshot = RosterSnapshot {
            version: SNAPSHOT_VERSION,
            employees,
        };

        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StorageError::UnableToSerialize(anyhow::Error::new(e)))?;

        self.lock()?.write_blob(EMPLOYEES_SLOT, bytes)
    }

    /// Accepts the versioned envelope and the bare array older builds wrote.
    /// Entries that fail to decode are skipped one by one.
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Employee>, String> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

        let entries = match value {
            Value::Array(entries) => entries,
            Value::Object(mut envelope) => {
                match envelope.get("version").and_then(Value::as_u64) {
                    Some(version) if version == u64::from(SNAPSHOT_VERSION) => {}
                    Some(version) => return Err(format!("unsupported version {}", version)),
                    None => return Err("missing version".to_string()),
                }

                match envelope.remove("employees") {
                    Some(Value::Array(entries)) => entries,
                    _ => return Err("employees is not a list".to_string()),
                }
            }
            _ => return Err("payload is not a list".to_string()),
        };

        let mut seen = HashSet::new();
        let mut employees = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let employee = match serde_json::from_value::<Employee>(entry) {
                Ok(employee) => employee,
                Err(e) => {
                    self.report_entry(index, e.to_string());
                    continue;
                }
            };

            if employee.name.trim().is_empty() {
                self.report_entry(index, "empty name".to_string());
                continue;
            }

            if !seen.insert(employee.id.clone()) {
                self.report_entry(index, format!("duplicate id {}", employee.id));
                continue;
            }

            employees.push(employee);
        }

        Ok(employees)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, dyn Storage + Sync + Send + 'static>> {
        self.storage.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn report_corrupt(&self, reason: &str) {
        self.sink.emit(Diagnostic::CorruptSnapshot {
            slot: EMPLOYEES_SLOT.to_string(),
            reason: reason.to_string(),
        });
    }

    fn report_entry(&self, index: usize, reason: String) {
        self.sink
            .emit(Diagnostic::SnapshotEntryDropped { index, reason });
    }
}
