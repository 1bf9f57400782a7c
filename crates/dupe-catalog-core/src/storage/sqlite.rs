use rusqlite::{Connection, Result};
use tracing::{debug, info};

pub const SCHEMA_VERSION: i64 = 2;

/// Owned handle on the persisted catalog. One writer at a time; WAL mode
/// lets other connections read concurrently.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 64MB cache)");
        Ok(())
    }

    /// Create missing tables and bring older layouts up to date.
    /// Version 1 stores predate the `is_ignored` flag; the column is added
    /// with a default of 0 and existing rows are left untouched.
    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if self.table_exists("catalog_entry")? && !self.has_column("catalog_entry", "is_ignored")? {
            info!("Catalog schema version {} lacks is_ignored, adding column", version);
            self.conn.execute_batch(
                "ALTER TABLE catalog_entry ADD COLUMN is_ignored INTEGER NOT NULL DEFAULT 0;",
            )?;
        }

        self.conn.execute_batch(include_str!("schema.sql"))?;

        if version != SCHEMA_VERSION {
            self.conn
                .execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;
        }
        debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
        Ok(())
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub(crate) fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", table))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>("name"))?
            .collect::<Result<Vec<_>>>()?;
        Ok(names.iter().any(|name| name == column))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drop every catalogued entry. Soft-deleted rows go too.
    pub fn truncate_all(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM catalog_entry", [])?;
        debug!("Catalog reset, {} entries removed", removed);
        Ok(removed)
    }
}
