use serde::{Deserialize, Serialize};

use crate::consts::consts::EntityId;

use super::employee::Employee;

/// Mutations applied to the employee table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Statement {
    Add(Employee),
    /// Removing an id that does not exist is a no-op
    Remove(EntityId),
    /// Drops every current row and installs the given roster
    ReplaceAll(Vec<Employee>),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum StatementResult {
    Single(Employee),
    /// The removed employee, `None` when the id was not present
    Removed(Option<Employee>),
    /// Number of rows installed by a replace
    Replaced(usize),
}
