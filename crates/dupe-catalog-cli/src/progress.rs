use colored::*;
use dupe_catalog_core::{ProgressReporter, SyncPhase, SyncReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Spinner while counting, then a bar over the counted files.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        // Progress output is best effort; recover from a poisoned lock.
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.slot();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.slot().take() {
            pb.finish_and_clear();
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(pb) = self.slot().as_ref() {
            f(pb);
        }
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars(TICK_CHARS));
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn file_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "  {spinner:.cyan} Syncing [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
    ) {
        pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl ProgressReporter for CliReporter {
    fn on_phase(&self, phase: SyncPhase) {
        if phase == SyncPhase::Scanning {
            self.set_bar(spinner("Counting media files..."));
        }
    }

    fn on_count_complete(&self, total: usize) {
        self.finish_bar();
        eprintln!("  {} {} media files found", "✓".green(), total);
        self.set_bar(file_bar(total));
    }

    fn on_file_progress(&self, current: usize, _total: usize, _current_path: &str) {
        self.with_bar(|pb| pb.set_position(current as u64));
    }

    fn on_file_error(&self, path: &str, message: &str) {
        self.with_bar(|pb| pb.println(format!("  {} {}: {}", "✗".red(), path, message)));
    }

    fn on_sync_complete(&self, report: &SyncReport) {
        self.finish_bar();
        let mark = if report.was_interrupted() {
            "!".yellow()
        } else {
            "✓".green()
        };
        eprintln!(
            "  {} Sync {} in {:.2}s",
            mark,
            report.phase,
            report.duration.as_secs_f64()
        );
    }
}
