use std::{
    fmt,
    sync::{Arc, Mutex},
};

use num_format::{Locale, ToFormattedString};

/// Events worth reporting that never fail an operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Import row that was skipped, `row` is the zero based input index
    RowDropped { row: usize, reason: String },
    ImportSummary { accepted: usize, dropped: usize },
    PersistenceFailed { slot: String, reason: String },
    /// Persisted payload could not be read at all, the roster starts empty
    CorruptSnapshot { slot: String, reason: String },
    /// Single persisted entry that was skipped while the rest loaded
    SnapshotEntryDropped { index: usize, reason: String },
}

impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        !matches!(self, Diagnostic::ImportSummary { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::RowDropped { row, reason } => {
                write!(f, "Dropped import row [Row: {}]: {}", row + 1, reason)
            }
            Diagnostic::ImportSummary { accepted, dropped } => write!(
                f,
                "Import parsed [Accepted: {}, Dropped: {}]",
                accepted.to_formatted_string(&Locale::en),
                dropped.to_formatted_string(&Locale::en)
            ),
            Diagnostic::PersistenceFailed { slot, reason } => {
                write!(f, "Unable to persist [{}]: {}", slot, reason)
            }
            Diagnostic::CorruptSnapshot { slot, reason } => write!(
                f,
                "Ignoring unreadable data in [{}], starting empty: {}",
                slot, reason
            ),
            Diagnostic::SnapshotEntryDropped { index, reason } => {
                write!(f, "Skipped persisted entry [Index: {}]: {}", index, reason)
            }
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

pub type SharedSink = Arc<dyn DiagnosticSink>;

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, diagnostic: Diagnostic) {
        if diagnostic.is_warning() {
            log::warn!("⚠️  {}", diagnostic);
        } else {
            log::info!("{}", diagnostic);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _: Diagnostic) {}
}

/// Keeps every diagnostic in memory so callers can inspect them afterwards
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn dropped_rows(&self) -> usize {
        self.events()
            .iter()
            .filter(|d| matches!(d, Diagnostic::RowDropped { .. }))
            .count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match self.events.lock() {
            Ok(mut events) => events.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

pub fn log_sink() -> SharedSink {
    Arc::new(LogSink)
}
