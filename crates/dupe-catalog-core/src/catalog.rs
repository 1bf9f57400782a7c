use crate::analysis::grouping::{self, DuplicateGroup, GroupQuery};
use crate::config::AppConfig;
use crate::error::Error;
use crate::extractor::{MediaProbe, NativeProbe};
use crate::media::MediaScope;
use crate::progress::ProgressReporter;
use crate::storage::{CatalogEntry, Database, DeletedStats};
use crate::sync::{SyncEngine, SyncReport};
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

/// The handle a front end holds: the store plus the engine that fills it.
pub struct Catalog {
    db: Database,
    engine: SyncEngine,
}

impl Catalog {
    pub fn open(config: &AppConfig) -> Result<Self, Error> {
        let probe = Arc::new(NativeProbe::new(config.ffprobe_path.clone()));
        Self::open_with_probe(config, probe)
    }

    pub fn open_with_probe(config: &AppConfig, probe: Arc<dyn MediaProbe>) -> Result<Self, Error> {
        config.validate()?;
        let db = Database::open(&config.db_path)?;
        debug!("Catalog opened at {}", config.db_path);
        Ok(Self::from_parts(db, SyncEngine::new(config, probe)))
    }

    pub fn from_parts(db: Database, engine: SyncEngine) -> Self {
        Self { db, engine }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.engine.cancel_token()
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn list_groups(&self, query: &GroupQuery) -> Result<Vec<DuplicateGroup>, Error> {
        grouping::group(&self.db, query)
    }

    pub fn list_corrupted(&self, scope: MediaScope) -> Result<Vec<CatalogEntry>, Error> {
        grouping::corrupted_entries(&self.db, scope)
    }

    pub fn stats(&self) -> Result<DeletedStats, Error> {
        Ok(self.db.aggregate_deleted()?)
    }

    pub fn all_paths(&self) -> Result<HashSet<String>, Error> {
        Ok(self.db.all_paths()?)
    }

    // ── Soft flags ───────────────────────────────────────────────

    /// Record that the file was removed by the front end. Unknown paths are
    /// ignored; returns whether an entry was flagged.
    pub fn mark_deleted(&self, path: &str) -> Result<bool, Error> {
        let flagged = self.db.set_deleted(path)?;
        if !flagged {
            debug!("mark_deleted: {} is not catalogued", path);
        }
        Ok(flagged)
    }

    /// Returns the new ignored state, or None for unknown paths.
    pub fn toggle_ignored(&self, path: &str) -> Result<Option<bool>, Error> {
        Ok(self.db.toggle_ignored(path)?)
    }

    // ── Runs ─────────────────────────────────────────────────────

    pub fn run_full_scan(&self, reporter: &dyn ProgressReporter) -> Result<SyncReport, Error> {
        self.engine.run_full_scan(&self.db, reporter)
    }

    pub fn run_delta_sync(&self, reporter: &dyn ProgressReporter) -> Result<SyncReport, Error> {
        self.engine.run_delta_sync(&self.db, reporter)
    }

    /// Erase the whole catalog, soft-flagged entries included.
    pub fn reset(&self) -> Result<usize, Error> {
        let removed = self.db.truncate_all()?;
        info!("Catalog reset: {} entries removed", removed);
        Ok(removed)
    }
}
