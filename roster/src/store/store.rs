use std::time::Instant;

use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use thiserror::Error;

use crate::{
    calendar::window::{self, Horizon, UpcomingBirthday},
    consts::consts::{EntityId, EMPLOYEES_SLOT},
    diagnostics::{Diagnostic, SharedSink},
    import::importer::{ImportMode, ImportReport},
    model::{
        employee::{Employee, NewEmployee},
        statement::{Statement, StatementResult},
    },
    persistence::{
        snapshot::{RestoredRoster, SnapshotManager},
        storage::{SharedStorage, StorageError},
    },
};

use super::{
    options::StoreOptions,
    table::{ApplyErrors, EmployeeTable},
};

/// Problems that do not undo a mutation
#[derive(Error, Debug)]
pub enum StoreWarning {
    #[error("Changes are kept for this session but could not be saved: {0}")]
    PersistenceFailed(StorageError),
}

#[derive(Debug)]
pub struct StoreResponse<T> {
    pub result: T,
    /// Set when the in-memory change succeeded but was not persisted
    pub warning: Option<StoreWarning>,
}

impl<T> StoreResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StoreResponse<U> {
        StoreResponse {
            result: f(self.result),
            warning: self.warning,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.warning.is_none()
    }
}

/// Authoritative in-memory roster. Every mutation is written through to storage.
pub struct RosterStore {
    table: EmployeeTable,
    snapshot_manager: SnapshotManager,
    sink: SharedSink,
    options: StoreOptions,
}

impl RosterStore {
    pub fn open(options: StoreOptions, sink: SharedSink) -> Self {
        let storage = options.storage_engine.get_engine();

        Self::with_storage(storage, options, sink)
    }

    pub fn with_storage(storage: SharedStorage, options: StoreOptions, sink: SharedSink) -> Self {
        let mut store = Self {
            table: EmployeeTable::new(),
            snapshot_manager: SnapshotManager::new(storage, sink.clone()),
            sink,
            options,
        };

        store.restore();

        store
    }

    fn restore(&mut self) {
        let now = Instant::now();

        if let Err(err) = self.snapshot_manager.init() {
            self.report_persistence_failure(&err);
        }

        let restored = match self.options.restore {
            true => self.snapshot_manager.restore(),
            false => RestoredRoster::NotFound,
        };

        let employees = match restored {
            RestoredRoster::Found(employees) => employees,
            RestoredRoster::NotFound | RestoredRoster::Corrupt(_) => self
                .options
                .seed_roster
                .iter()
                .cloned()
                .map(Employee::from_new)
                .collect(),
        };

        // Persisted rows were already checked while decoding and seeds are trusted input
        if let Err(err) = self.table.apply(Statement::ReplaceAll(employees)) {
            log::warn!("⚠️  Ignoring restored roster: {}", err);
        }

        let engine = self
            .options
            .storage_engine
            .get_engine_info_stats()
            .into_iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<String>>()
            .join(", ");

        log::info!(
            "✅ Successful Restore [Duration: {}ms]",
            now.elapsed().as_millis()
        );

        log::info!(
            "📀 Data               [Rows: {}, {}]",
            self.table.len().to_formatted_string(&Locale::en),
            engine
        );
    }

    pub fn add(&mut self, new_employee: NewEmployee) -> Result<StoreResponse<Employee>, ApplyErrors> {
        let employee = Employee::from_new(trimmed(new_employee));

        let response = self.process_statements(vec![Statement::Add(employee.clone())])?;

        Ok(response.map(|_| employee))
    }

    /// Adds every employee or none of them
    pub fn add_many(
        &mut self,
        new_employees: Vec<NewEmployee>,
    ) -> Result<StoreResponse<Vec<Employee>>, ApplyErrors> {
        let employees: Vec<Employee> = new_employees
            .into_iter()
            .map(|new_employee| Employee::from_new(trimmed(new_employee)))
            .collect();

        let statements = employees.iter().cloned().map(Statement::Add).collect();

        let response = self.process_statements(statements)?;

        Ok(response.map(|_| employees))
    }

    /// Removing an id that is not in the roster changes nothing, the list is still saved
    pub fn remove(&mut self, id: &EntityId) -> StoreResponse<Option<Employee>> {
        let removed = self.table.remove(id);

        log::info!("✅ Committed: [Removed: {}]", removed.is_some());

        StoreResponse {
            result: removed,
            warning: self.persist(),
        }
    }

    /// Validates every employee before anything is replaced
    pub fn replace_all(
        &mut self,
        employees: Vec<Employee>,
    ) -> Result<StoreResponse<usize>, ApplyErrors> {
        let employees = employees
            .into_iter()
            .map(|mut employee| {
                employee.name = employee.name.trim().to_string();
                employee
            })
            .collect();

        let response = self.process_statements(vec![Statement::ReplaceAll(employees)])?;

        Ok(response.map(|_| self.table.len()))
    }

    /// Applies an import, returns the number of employees it added
    pub fn import(
        &mut self,
        report: ImportReport,
        mode: ImportMode,
    ) -> Result<StoreResponse<usize>, ApplyErrors> {
        match mode {
            ImportMode::Append => Ok(self.add_many(report.records)?.map(|added| added.len())),
            ImportMode::Replace => {
                let employees = report
                    .records
                    .into_iter()
                    .map(Employee::from_new)
                    .collect();

                self.replace_all(employees)
            }
        }
    }

    /// Clears the roster and wipes persisted data
    pub fn reset(&mut self) -> StoreResponse<()> {
        self.table = EmployeeTable::new();

        let warning = match self.snapshot_manager.reset() {
            Ok(()) => None,
            Err(err) => {
                self.report_persistence_failure(&err);
                Some(StoreWarning::PersistenceFailed(err))
            }
        };

        StoreResponse {
            result: (),
            warning,
        }
    }

    /// Snapshot of the roster in insertion order
    pub fn list(&self) -> Vec<Employee> {
        self.table.rows().to_vec()
    }

    pub fn employees(&self) -> &[Employee] {
        self.table.rows()
    }

    pub fn get(&self, id: &EntityId) -> Option<&Employee> {
        self.table.get(id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn todays_birthdays(&self, today: NaiveDate) -> Vec<&Employee> {
        window::todays_birthdays(self.table.rows(), today)
    }

    pub fn upcoming_birthdays(&self, today: NaiveDate, horizon: Horizon) -> Vec<UpcomingBirthday<'_>> {
        window::upcoming_birthdays(self.table.rows(), today, horizon)
    }

    /// Applies the statements as one unit: the first failure rolls back the
    /// earlier statements. Committed mutations are saved before returning.
    fn process_statements(
        &mut self,
        statements: Vec<Statement>,
    ) -> Result<StoreResponse<Vec<StatementResult>>, ApplyErrors> {
        let checkpoint = self.table.checkpoint();
        let statement_count = statements.len();

        let mut results = Vec::with_capacity(statement_count);

        for statement in statements {
            match self.table.apply(statement) {
                Ok(result) => results.push(result),
                Err(err) => {
                    log::info!("⚠️  Rolled back: [Statements: {}] {}", statement_count, err);
                    self.table.rollback(checkpoint);
                    return Err(err);
                }
            }
        }

        log::info!("✅ Committed: [Statements: {}]", statement_count);

        let warning = self.persist();

        Ok(StoreResponse {
            result: results,
            warning,
        })
    }

    fn persist(&self) -> Option<StoreWarning> {
        match self.snapshot_manager.save(self.table.rows()) {
            Ok(()) => None,
            Err(err) => {
                self.report_persistence_failure(&err);
                Some(StoreWarning::PersistenceFailed(err))
            }
        }
    }

    fn report_persistence_failure(&self, err: &StorageError) {
        self.sink.emit(Diagnostic::PersistenceFailed {
            slot: EMPLOYEES_SLOT.to_string(),
            reason: err.to_string(),
        });
    }
}

fn trimmed(new_employee: NewEmployee) -> NewEmployee {
    NewEmployee {
        name: new_employee.name.trim().to_string(),
        birthday: new_employee.birthday,
    }
}

#[cfg(test)]
impl RosterStore {
    pub fn new_test() -> Self {
        use crate::diagnostics::NullSink;
        use std::sync::Arc;

        RosterStore::open(StoreOptions::new_test(), Arc::new(NullSink))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{Arc, Mutex},
    };

    use anyhow::anyhow;

    use super::*;
    use crate::{
        diagnostics::{NullSink, RecordingSink},
        import::{importer::import_rows, row::Row},
        persistence::storage::{
            memory::MemoryStorage, ReadBlobState, Storage, StorageEngine, StorageResult,
        },
    };

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    /// Reads succeed, every write fails
    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn init(&self) -> StorageResult<()> {
            Ok(())
        }

        fn reset(&self) -> StorageResult<()> {
            Err(StorageError::UnableToResetPersistence(anyhow!("read only")))
        }

        fn write_blob(&self, _: &str, _: Vec<u8>) -> StorageResult<()> {
            Err(StorageError::UnableToWriteBlob(anyhow!("disk full")))
        }

        fn read_blob(&self, _: &str) -> StorageResult<ReadBlobState> {
            Ok(ReadBlobState::NotFound)
        }
    }

    mod add {
        use super::*;

        #[test_log::test]
        fn add_then_list_contains_exactly_one_record() {
            // Given an empty store
            let mut store = RosterStore::new_test();

            // When we add an employee
            let response = store
                .add(NewEmployee::new("Ada", date(1815, 12, 10)))
                .expect("valid employee");

            // Then it is listed once, with the id that was assigned
            let listed = store.list();
            let matching: Vec<&Employee> = listed
                .iter()
                .filter(|e| e.name == "Ada" && e.birthday == date(1815, 12, 10))
                .collect();

            assert_eq!(matching.len(), 1);
            assert_eq!(matching[0].id, response.result.id);
            assert!(response.is_persisted());
        }

        #[test]
        fn ids_are_unique() {
            let mut store = RosterStore::new_test();

            for _ in 0..50 {
                store
                    .add(NewEmployee::new("Same Name", date(1990, 1, 1)))
                    .unwrap();
            }

            let ids: HashSet<EntityId> = store.list().into_iter().map(|e| e.id).collect();
            assert_eq!(ids.len(), 50);
        }

        #[test]
        fn blank_name_is_rejected() {
            let mut store = RosterStore::new_test();

            let result = store.add(NewEmployee::new("   ", date(1990, 1, 1)));

            assert!(matches!(
                result,
                Err(ApplyErrors::EmptyNameConstraintViolation(_))
            ));
            assert!(store.is_empty());
        }

        #[test]
        fn names_are_stored_trimmed() {
            let mut store = RosterStore::new_test();

            let response = store
                .add(NewEmployee::new("  Ada ", date(1815, 12, 10)))
                .unwrap();

            assert_eq!(response.result.name, "Ada");
        }

        #[test]
        fn add_many_is_all_or_nothing() {
            // Given a store with one employee
            let mut store = RosterStore::new_test();
            store.add(NewEmployee::new("Ada", date(1815, 12, 10))).unwrap();

            // When a batch contains an invalid employee
            let result = store.add_many(vec![
                NewEmployee::new("Grace", date(1906, 12, 9)),
                NewEmployee::new("", date(1990, 1, 1)),
            ]);

            // Then none of the batch is kept
            assert!(result.is_err());
            assert_eq!(store.len(), 1);
        }
    }

    mod remove {
        use super::*;

        #[test]
        fn removed_id_is_never_listed() {
            let mut store = RosterStore::new_test();
            let ada = store
                .add(NewEmployee::new("Ada", date(1815, 12, 10)))
                .unwrap()
                .result;
            store.add(NewEmployee::new("Grace", date(1906, 12, 9))).unwrap();

            let response = store.remove(&ada.id);

            assert_eq!(response.result, Some(ada.clone()));
            assert!(store.list().iter().all(|e| e.id != ada.id));
            assert_eq!(store.len(), 1);
        }

        #[test]
        fn removing_missing_id_leaves_list_unchanged() {
            let mut store = RosterStore::new_test();
            store.add(NewEmployee::new("Ada", date(1815, 12, 10))).unwrap();
            let before = store.list();

            let response = store.remove(&EntityId("does-not-exist".to_string()));

            assert_eq!(response.result, None);
            assert_eq!(store.list(), before);
        }

        #[test]
        fn removal_is_persisted() {
            // Given a file backed store with two employees
            let options = StoreOptions::new_test();
            let mut store = RosterStore::open(options.clone(), Arc::new(NullSink));
            let ada = store
                .add(NewEmployee::new("Ada", date(1815, 12, 10)))
                .unwrap()
                .result;
            store.add(NewEmployee::new("Grace", date(1906, 12, 9))).unwrap();

            // When one is removed
            let response = store.remove(&ada.id);

            // Then the save succeeded and a fresh store no longer sees them
            assert!(response.is_persisted());
            let reopened = RosterStore::open(options, Arc::new(NullSink));
            assert!(reopened.get(&ada.id).is_none());
            assert_eq!(reopened.len(), 1);
        }

        #[test]
        fn removal_save_failure_is_a_warning() {
            let storage: SharedStorage = Arc::new(Mutex::new(ReadOnlyStorage));
            let mut store =
                RosterStore::with_storage(storage, StoreOptions::default(), Arc::new(NullSink));

            let response = store.remove(&EntityId("does-not-exist".to_string()));

            assert_eq!(response.result, None);
            assert!(matches!(
                response.warning,
                Some(StoreWarning::PersistenceFailed(_))
            ));
        }
    }

    mod replace_all {
        use super::*;

        #[test]
        fn invalid_roster_changes_nothing() {
            let mut store = RosterStore::new_test();
            store.add(NewEmployee::new("Ada", date(1815, 12, 10))).unwrap();
            let before = store.list();

            let result = store.replace_all(vec![
                Employee::new("Grace".to_string(), date(1906, 12, 9)),
                Employee::new(" ".to_string(), date(1990, 1, 1)),
            ]);

            assert!(result.is_err());
            assert_eq!(store.list(), before);
        }

        #[test]
        fn replaces_and_persists() {
            // Given a file backed store
            let options = StoreOptions::new_test();
            let mut store = RosterStore::open(options.clone(), Arc::new(NullSink));
            store.add(NewEmployee::new("Ada", date(1815, 12, 10))).unwrap();

            // When the roster is replaced
            let replacement = vec![Employee::new("Grace".to_string(), date(1906, 12, 9))];
            let response = store.replace_all(replacement.clone()).unwrap();

            // Then the replacement is what a fresh store sees
            assert_eq!(response.result, 1);
            let reopened = RosterStore::open(options, Arc::new(NullSink));
            assert_eq!(reopened.list(), replacement);
        }
    }

    mod persistence {
        use super::*;

        #[test]
        fn reopening_restores_roster_in_order() {
            let options = StoreOptions::new_test();

            let mut store = RosterStore::open(options.clone(), Arc::new(NullSink));
            store.add(NewEmployee::new("Ada", date(1815, 12, 10))).unwrap();
            store.add(NewEmployee::new("Grace", date(1906, 12, 9))).unwrap();
            store.add(NewEmployee::new("Barbara", date(1939, 11, 3))).unwrap();
            let saved = store.list();

            let reopened = RosterStore::open(options, Arc::new(NullSink));

            assert_eq!(reopened.list(), saved);
        }

        #[test_log::test]
        fn write_failure_is_a_warning_not_an_error() {
            // Given a store whose storage rejects writes
            let sink = Arc::new(RecordingSink::new());
            let storage: SharedStorage = Arc::new(Mutex::new(ReadOnlyStorage));
            let mut store =
                RosterStore::with_storage(storage, StoreOptions::default(), sink.clone());

            // When we add an employee
            let response = store
                .add(NewEmployee::new("Ada", date(1815, 12, 10)))
                .expect("in-memory add should succeed");

            // Then the change stays in memory
            assert_eq!(store.len(), 1);

            // And the failure is surfaced to the caller and the sink
            assert!(matches!(
                response.warning,
                Some(StoreWarning::PersistenceFailed(StorageError::UnableToWriteBlob(_)))
            ));
            assert!(sink
                .events()
                .iter()
                .any(|d| matches!(d, Diagnostic::PersistenceFailed { .. })));
        }

        #[test]
        fn corrupt_payload_opens_with_seed_roster() {
            // Given storage holding garbage
            let storage: SharedStorage = Arc::new(Mutex::new(MemoryStorage::new()));
            storage
                .lock()
                .unwrap()
                .write_blob(EMPLOYEES_SLOT, b"{ definitely not json".to_vec())
                .unwrap();

            // When a store with a seed roster opens
            let options = StoreOptions::default()
                .set_storage_engine(StorageEngine::Memory)
                .set_seed_roster(vec![NewEmployee::new("Seed", date(2000, 1, 1))]);
            let store = RosterStore::with_storage(storage, options, Arc::new(NullSink));

            // Then the seed is used instead of crashing
            let names: Vec<String> = store.list().into_iter().map(|e| e.name).collect();
            assert_eq!(names, vec!["Seed".to_string()]);
        }

        #[test]
        fn persisted_empty_roster_does_not_reseed() {
            let storage: SharedStorage = Arc::new(Mutex::new(MemoryStorage::new()));
            let options = StoreOptions::default()
                .set_seed_roster(vec![NewEmployee::new("Seed", date(2000, 1, 1))]);

            // Given the seed was removed and the empty roster saved
            let mut store =
                RosterStore::with_storage(storage.clone(), options.clone(), Arc::new(NullSink));
            let seed_id = store.list()[0].id.clone();
            store.remove(&seed_id);

            // Then reopening keeps it empty
            let reopened = RosterStore::with_storage(storage, options, Arc::new(NullSink));
            assert!(reopened.is_empty());
        }

        #[test]
        fn restore_disabled_ignores_persisted_data() {
            let options = StoreOptions::new_test();
            let mut store = RosterStore::open(options.clone(), Arc::new(NullSink));
            store.add(NewEmployee::new("Ada", date(1815, 12, 10))).unwrap();

            let fresh = RosterStore::open(options.set_restore(false), Arc::new(NullSink));

            assert!(fresh.is_empty());
        }

        #[test]
        fn reset_wipes_memory_and_storage() {
            let options = StoreOptions::new_test();
            let mut store = RosterStore::open(options.clone(), Arc::new(NullSink));
            store.add(NewEmployee::new("Ada", date(1815, 12, 10))).unwrap();

            let response = store.reset();

            assert!(response.is_persisted());
            assert!(store.is_empty());
            assert!(RosterStore::open(options, Arc::new(NullSink)).is_empty());
        }
    }

    mod import {
        use super::*;

        fn report() -> ImportReport {
            let rows = vec![
                Row::new().with("Name", "A").with("Birthday", "1990-01-01"),
                Row::new().with("Name", "").with("Birthday", "1990-01-02"),
                Row::new().with("name", "B").with("dob", 32874_i64),
            ];

            import_rows(&rows, &NullSink).unwrap()
        }

        #[test]
        fn append_keeps_existing_roster() {
            let mut store = RosterStore::new_test();
            store.add(NewEmployee::new("Ada", date(1815, 12, 10))).unwrap();

            let response = store.import(report(), ImportMode::Append).unwrap();

            assert_eq!(response.result, 2);
            let names: Vec<String> = store.list().into_iter().map(|e| e.name).collect();
            assert_eq!(names, vec!["Ada", "A", "B"]);
        }

        #[test]
        fn replace_overwrites_roster() {
            let mut store = RosterStore::new_test();
            store.add(NewEmployee::new("Ada", date(1815, 12, 10))).unwrap();

            let response = store.import(report(), ImportMode::Replace).unwrap();

            assert_eq!(response.result, 2);
            let names: Vec<String> = store.list().into_iter().map(|e| e.name).collect();
            assert_eq!(names, vec!["A", "B"]);
            assert!(store.list().iter().all(|e| e.birthday == date(1990, 1, 1)));
        }
    }

    mod birthdays {
        use super::*;

        #[test]
        fn today_and_upcoming_use_current_roster() {
            let mut store = RosterStore::new_test();
            store.add(NewEmployee::new("Today", date(1980, 6, 1))).unwrap();
            store.add(NewEmployee::new("Soon", date(1992, 6, 10))).unwrap();
            store.add(NewEmployee::new("Later", date(1985, 9, 1))).unwrap();

            let today = date(2024, 6, 1);

            let todays = store.todays_birthdays(today);
            let names: Vec<&str> = todays.iter().map(|e| e.name.as_str()).collect();
            assert_eq!(names, vec!["Today"]);

            let upcoming = store.upcoming_birthdays(today, Horizon::Months(1));
            let names: Vec<&str> = upcoming
                .iter()
                .map(|u| u.employee.name.as_str())
                .collect();
            assert_eq!(names, vec!["Today", "Soon"]);
        }
    }
}
