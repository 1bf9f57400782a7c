use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Index everything not yet catalogued; never removes entries.
    Full,
    /// Reconcile the catalog with disk: new, modified, removed.
    Delta,
}

/// Where a run is. `Interrupted` is reachable from every other phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Scanning,
    Classifying,
    Applying,
    Done,
    Interrupted,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Scanning => "scanning",
            SyncPhase::Classifying => "classifying",
            SyncPhase::Applying => "applying",
            SyncPhase::Done => "done",
            SyncPhase::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

/// A file that could not be fingerprinted. It stays out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub phase: SyncPhase,
    pub total: usize,
    pub processed: usize,
    pub new: usize,
    pub modified: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Already catalogued paths a full scan resumed past.
    pub skipped_existing: usize,
    pub errors: Vec<FileError>,
    /// Rows inserted, updated or deleted.
    pub writes: usize,
    pub duration: Duration,
}

impl SyncReport {
    pub(crate) fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            phase: SyncPhase::Scanning,
            total: 0,
            processed: 0,
            new: 0,
            modified: 0,
            removed: 0,
            unchanged: 0,
            skipped_existing: 0,
            errors: Vec::new(),
            writes: 0,
            duration: Duration::ZERO,
        }
    }

    pub fn was_interrupted(&self) -> bool {
        self.phase == SyncPhase::Interrupted
    }
}
