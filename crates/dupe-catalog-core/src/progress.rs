use crate::sync::{SyncPhase, SyncReport};

/// Trait for reporting sync progress.
///
/// CLI implements with indicatif; other front ends forward to their own widgets.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_phase(&self, _phase: SyncPhase) {}
    fn on_count_complete(&self, _total: usize) {}
    fn on_file_progress(&self, _current: usize, _total: usize, _current_path: &str) {}
    fn on_file_error(&self, _path: &str, _message: &str) {}
    fn on_batch_committed(&self, _writes: usize) {}
    fn on_sync_complete(&self, _report: &SyncReport) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
