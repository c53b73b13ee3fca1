use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::consts::consts::EntityId;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Employee {
    pub id: EntityId,
    pub name: String,
    /// Birth date, only month and day matter for recurring birthdays
    pub birthday: NaiveDate,
}

impl Employee {
    pub fn new(name: String, birthday: NaiveDate) -> Self {
        Employee {
            id: EntityId::new(),
            name,
            birthday,
        }
    }

    pub fn from_new(new_employee: NewEmployee) -> Self {
        Employee::new(new_employee.name, new_employee.birthday)
    }
}

#[cfg(test)]
impl Employee {
    pub fn new_test() -> Self {
        Employee {
            id: EntityId("1".to_string()),
            name: "Full Name".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid date"),
        }
    }
}

/// An employee that has not been assigned an id yet (manual entry or import)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NewEmployee {
    pub name: String,
    pub birthday: NaiveDate,
}

impl NewEmployee {
    pub fn new(name: impl Into<String>, birthday: NaiveDate) -> Self {
        NewEmployee {
            name: name.into(),
            birthday,
        }
    }
}
