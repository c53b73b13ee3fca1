use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// New Type Pattern -- https://doc.rust-lang.org/rust-by-example/generics/new_types.html
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new() -> EntityId {
        EntityId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Values

/// Storage slot holding the full employee list
pub const EMPLOYEES_SLOT: &str = "employees";

/// Version written into every persisted payload
pub const SNAPSHOT_VERSION: u32 = 1;

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch
pub const SERIAL_UNIX_EPOCH_OFFSET: f64 = 25569.0;

pub const MILLIS_PER_DAY: f64 = 86_400_000.0;
