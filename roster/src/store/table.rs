use std::collections::HashSet;

use thiserror::Error;

use crate::{
    consts::consts::EntityId,
    model::{
        employee::Employee,
        statement::{Statement, StatementResult},
    },
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyErrors {
    // CRUD - CREATE
    #[error("Cannot create, record already exists: {0}")]
    CannotCreateWhenAlreadyExists(EntityId),

    // Constraints
    #[error("Cannot add row as the name is empty: {0}")]
    EmptyNameConstraintViolation(EntityId),

    #[error("Cannot replace roster as the id appears more than once: {0}")]
    UniqueConstraintViolation(EntityId),
}

/// Rows captured before a transaction so a failed statement can undo the earlier ones
pub struct Checkpoint(Vec<Employee>);

/// Roster rows in insertion order with a unique id index
#[derive(Debug, Default)]
pub struct EmployeeTable {
    rows: Vec<Employee>,
    ids: HashSet<EntityId>,
}

impl EmployeeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Employee] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &EntityId) -> Option<&Employee> {
        self.rows.iter().find(|employee| &employee.id == id)
    }

    // Each mutation can be broken up into 2 steps
    //  - Verifying validity / constraints (non-empty name, uniqueness)
    //  - Applying the statement
    pub fn apply(&mut self, statement: Statement) -> Result<StatementResult, ApplyErrors> {
        let statement_result = match statement {
            Statement::Add(employee) => {
                validate_employee(&employee)?;

                if self.ids.contains(&employee.id) {
                    return Err(ApplyErrors::CannotCreateWhenAlreadyExists(employee.id));
                }

                self.ids.insert(employee.id.clone());
                self.rows.push(employee.clone());

                StatementResult::Single(employee)
            }
            Statement::Remove(id) => StatementResult::Removed(self.remove(&id)),
            Statement::ReplaceAll(employees) => {
                let ids = validate_roster(&employees)?;
                let count = employees.len();

                self.rows = employees;
                self.ids = ids;

                StatementResult::Replaced(count)
            }
        };

        Ok(statement_result)
    }

    /// Removal has no constraints to violate, a missing id returns `None`
    pub fn remove(&mut self, id: &EntityId) -> Option<Employee> {
        if !self.ids.remove(id) {
            return None;
        }

        self.rows
            .iter()
            .position(|employee| &employee.id == id)
            .map(|index| self.rows.remove(index))
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.rows.clone())
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.ids = checkpoint.0.iter().map(|employee| employee.id.clone()).collect();
        self.rows = checkpoint.0;
    }
}

pub fn validate_employee(employee: &Employee) -> Result<(), ApplyErrors> {
    if employee.name.trim().is_empty() {
        return Err(ApplyErrors::EmptyNameConstraintViolation(
            employee.id.clone(),
        ));
    }

    Ok(())
}

/// Checks every row before anything is replaced, returns the id index
fn validate_roster(employees: &[Employee]) -> Result<HashSet<EntityId>, ApplyErrors> {
    let mut ids = HashSet::with_capacity(employees.len());

    for employee in employees {
        validate_employee(employee)?;

        if !ids.insert(employee.id.clone()) {
            return Err(ApplyErrors::UniqueConstraintViolation(employee.id.clone()));
        }
    }

    Ok(ids)
}
