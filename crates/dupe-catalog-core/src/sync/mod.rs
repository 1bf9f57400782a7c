mod report;

pub use report::{FileError, SyncMode, SyncPhase, SyncReport};

use crate::config::AppConfig;
use crate::error::Error;
use crate::extractor::{Extractor, MediaProbe};
use crate::progress::ProgressReporter;
use crate::scanner::{self, MediaFile, WalkFailure, WalkFilter};
use crate::storage::{CatalogEntry, CatalogWrite, Database, IndexedState};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// What the catalog already knows, captured before the walk.
enum Baseline {
    /// Paths a resumed full scan skips.
    Done(HashSet<String>),
    /// Size and creation time per path, compared against disk.
    Known(HashMap<String, IndexedState>),
}

enum FileOutcome {
    Cancelled,
    SkippedExisting,
    Unchanged,
    New(CatalogEntry),
    Modified(CatalogEntry),
    Failed(FileError),
}

/// Walks the watched root and brings the catalog in line with it.
/// Extraction runs on a bounded rayon pool; all writes go through the
/// calling thread, one transaction per batch.
pub struct SyncEngine {
    root: PathBuf,
    filter: WalkFilter,
    extractor: Extractor,
    batch_size: usize,
    worker_threads: usize,
    cancel_token: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(config: &AppConfig, probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            root: PathBuf::from(&config.root_path),
            filter: WalkFilter::new(&config.ignore_patterns),
            extractor: Extractor::new(probe, config.probe_timeout()),
            batch_size: config.batch_size.max(1),
            worker_threads: config.worker_threads,
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Setting the token asks a running sync to stop at the next file
    /// boundary. It is cleared when a run starts.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token.load(Ordering::Relaxed)
    }

    /// Index every media file not yet in the catalog. Previously catalogued
    /// paths are skipped without re-extraction, so an interrupted scan
    /// resumes where it stopped.
    pub fn run_full_scan(
        &self,
        db: &Database,
        reporter: &dyn ProgressReporter,
    ) -> Result<SyncReport, Error> {
        self.run(db, SyncMode::Full, reporter)
    }

    /// Reconcile the catalog with disk, re-extracting only files whose size
    /// or creation time drifted, and dropping entries whose file is gone.
    pub fn run_delta_sync(
        &self,
        db: &Database,
        reporter: &dyn ProgressReporter,
    ) -> Result<SyncReport, Error> {
        self.run(db, SyncMode::Delta, reporter)
    }

    fn run(
        &self,
        db: &Database,
        mode: SyncMode,
        reporter: &dyn ProgressReporter,
    ) -> Result<SyncReport, Error> {
        self.cancel_token.store(false, Ordering::Relaxed);
        let started = Instant::now();
        let mut report = SyncReport::new(mode);
        let mut phase = Transitions::new(reporter);

        let root = scanner::resolve_root(&self.root)?;
        info!("{:?} sync of {}", mode, root.display());

        phase.enter(SyncPhase::Scanning);
        report.total = scanner::count_media_files(&root, &self.filter);
        reporter.on_count_complete(report.total);
        debug!("{} media files under {}", report.total, root.display());

        let baseline = match mode {
            SyncMode::Full => Baseline::Done(db.all_paths()?),
            SyncMode::Delta => Baseline::Known(db.indexed_states()?),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .build()
            .map_err(|e| Error::Other(format!("cannot start extraction pool: {}", e)))?;

        let processed = AtomicUsize::new(0);
        let mut seen: HashSet<String> = HashSet::new();
        let mut unreached: Vec<PathBuf> = Vec::new();
        let mut interrupted = self.is_cancelled();
        let mut walk = scanner::media_files(&root, &self.filter);

        while !interrupted {
            let walked: Vec<Result<MediaFile, WalkFailure>> =
                walk.by_ref().take(self.batch_size).collect();
            if walked.is_empty() {
                break;
            }
            let mut chunk = Vec::with_capacity(walked.len());
            for item in walked {
                match item {
                    Ok(file) => chunk.push(file),
                    Err(failure) => {
                        let location = failure.path.unwrap_or_else(|| root.clone());
                        let error = FileError {
                            path: scanner::normalize_path(&location),
                            message: failure.message,
                        };
                        reporter.on_file_error(&error.path, &error.message);
                        report.errors.push(error);
                        unreached.push(location);
                    }
                }
            }
            if chunk.is_empty() {
                interrupted |= self.is_cancelled();
                continue;
            }
            if mode == SyncMode::Delta {
                seen.extend(chunk.iter().map(|f| f.key.clone()));
            }

            phase.enter(SyncPhase::Classifying);
            let outcomes: Vec<FileOutcome> = pool.install(|| {
                chunk
                    .par_iter()
                    .map(|file| {
                        let outcome = self.process_file(file, &baseline);
                        if !matches!(outcome, FileOutcome::Cancelled) {
                            let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                            reporter.on_file_progress(current, report.total, &file.key);
                        }
                        outcome
                    })
                    .collect()
            });

            let mut writes = Vec::with_capacity(outcomes.len());
            for outcome in outcomes {
                match outcome {
                    FileOutcome::Cancelled => interrupted = true,
                    FileOutcome::SkippedExisting => report.skipped_existing += 1,
                    FileOutcome::Unchanged => report.unchanged += 1,
                    FileOutcome::New(entry) => {
                        report.new += 1;
                        writes.push(CatalogWrite::Upsert(entry));
                    }
                    FileOutcome::Modified(entry) => {
                        report.modified += 1;
                        writes.push(CatalogWrite::Upsert(entry));
                    }
                    FileOutcome::Failed(error) => {
                        reporter.on_file_error(&error.path, &error.message);
                        report.errors.push(error);
                    }
                }
            }

            phase.enter(SyncPhase::Applying);
            self.commit(db, &writes, &mut report, reporter)?;
            interrupted |= self.is_cancelled();
        }

        if !interrupted {
            if let Baseline::Known(known) = &baseline {
                if !unreached.is_empty() {
                    warn!(
                        "{} unreadable locations, their catalogued files are kept",
                        unreached.len()
                    );
                }
                let vanished = vanished_paths(known, &seen, &root, &unreached);
                if !vanished.is_empty() {
                    info!("Removing {} entries no longer on disk", vanished.len());
                }
                phase.enter(SyncPhase::Applying);
                for batch in vanished.chunks(self.batch_size) {
                    if self.is_cancelled() {
                        interrupted = true;
                        break;
                    }
                    let writes: Vec<CatalogWrite> =
                        batch.iter().cloned().map(CatalogWrite::Delete).collect();
                    self.commit(db, &writes, &mut report, reporter)?;
                    report.removed += batch.len();
                }
            }
        }

        report.processed = processed.load(Ordering::Relaxed);
        report.duration = started.elapsed();
        report.phase = if interrupted {
            SyncPhase::Interrupted
        } else {
            SyncPhase::Done
        };
        phase.enter(report.phase);

        info!(
            "{:?} sync {}: {} new, {} modified, {} removed, {} unchanged, {} errors in {:.2}s",
            mode,
            report.phase,
            report.new,
            report.modified,
            report.removed,
            report.unchanged,
            report.errors.len(),
            report.duration.as_secs_f64(),
        );
        reporter.on_sync_complete(&report);
        Ok(report)
    }

    fn commit(
        &self,
        db: &Database,
        writes: &[CatalogWrite],
        report: &mut SyncReport,
        reporter: &dyn ProgressReporter,
    ) -> Result<(), Error> {
        if writes.is_empty() {
            return Ok(());
        }
        let written = db.apply_writes(writes)?;
        report.writes += written;
        reporter.on_batch_committed(written);
        Ok(())
    }

    /// Classify one file and extract it if needed. Checked for cancellation
    /// before any work starts; never interrupted mid-hash.
    fn process_file(&self, file: &MediaFile, baseline: &Baseline) -> FileOutcome {
        if self.is_cancelled() {
            return FileOutcome::Cancelled;
        }

        let previous = match baseline {
            Baseline::Done(done) if done.contains(&file.key) => {
                return FileOutcome::SkippedExisting;
            }
            Baseline::Done(_) => None,
            Baseline::Known(known) => known.get(&file.key),
        };

        let observed = match self.extractor.observe(&file.path, file.media_class) {
            Ok(observed) => observed,
            Err(e) => return failed(file, e),
        };

        if previous == Some(&observed) {
            trace!("Unchanged: {}", file.key);
            return FileOutcome::Unchanged;
        }

        let fingerprint = match self
            .extractor
            .complete(&file.path, file.media_class, observed)
        {
            Ok(fingerprint) => fingerprint,
            Err(e) => return failed(file, e),
        };
        let entry = CatalogEntry::from_fingerprint(&file.key, file.media_class, fingerprint);

        if previous.is_some() {
            trace!("Modified: {}", file.key);
            FileOutcome::Modified(entry)
        } else {
            trace!("New: {}", file.key);
            FileOutcome::New(entry)
        }
    }
}

fn failed(file: &MediaFile, error: crate::error::ExtractionError) -> FileOutcome {
    warn!("Failed to extract metadata for {}: {}", file.key, error);
    FileOutcome::Failed(FileError {
        path: file.key.clone(),
        message: error.to_string(),
    })
}

/// Catalogued paths under `root` that the walk did not see. Anything at or
/// below an `unreached` location is kept, since the walk never looked there.
fn vanished_paths(
    known: &HashMap<String, IndexedState>,
    seen: &HashSet<String>,
    root: &Path,
    unreached: &[PathBuf],
) -> Vec<String> {
    let mut vanished: Vec<String> = known
        .keys()
        .filter(|key| {
            let path = Path::new(key.as_str());
            !seen.contains(key.as_str())
                && path.starts_with(root)
                && !unreached.iter().any(|skipped| path.starts_with(skipped))
        })
        .cloned()
        .collect();
    vanished.sort();
    vanished
}

/// Forwards phase changes to the reporter, once per change.
struct Transitions<'a> {
    current: Option<SyncPhase>,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> Transitions<'a> {
    fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            current: None,
            reporter,
        }
    }

    fn enter(&mut self, phase: SyncPhase) {
        if self.current != Some(phase) {
            trace!("Sync phase: {}", phase);
            self.current = Some(phase);
            self.reporter.on_phase(phase);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> IndexedState {
        IndexedState {
            size_bytes: 1,
            created_at: "2020-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_vanished_paths_skip_unreached_subtrees() {
        let known: HashMap<String, IndexedState> = [
            "/lib/seen.jpg",
            "/lib/gone.jpg",
            "/lib/locked/kept.jpg",
            "/lib/locked/deeper/kept.mp4",
            "/lib/locked_sibling/gone.png",
            "/other/outside.jpg",
        ]
        .iter()
        .map(|p| (p.to_string(), state()))
        .collect();
        let seen: HashSet<String> = ["/lib/seen.jpg".to_string()].into_iter().collect();
        let unreached = vec![PathBuf::from("/lib/locked")];

        let vanished = vanished_paths(&known, &seen, Path::new("/lib"), &unreached);
        assert_eq!(
            vanished,
            vec![
                "/lib/gone.jpg".to_string(),
                "/lib/locked_sibling/gone.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_unreadable_root_keeps_everything() {
        let known: HashMap<String, IndexedState> = [("/lib/a.jpg".to_string(), state())]
            .into_iter()
            .collect();
        let vanished = vanished_paths(
            &known,
            &HashSet::new(),
            Path::new("/lib"),
            &[PathBuf::from("/lib")],
        );
        assert!(vanished.is_empty());
    }
}
