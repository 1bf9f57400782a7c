use crate::media::MediaClass;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// One catalogued file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i64,
    pub path: String,
    pub name: String,
    pub content_hash: String,
    pub size_bytes: i64,
    /// Canonical `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
    pub extension: String,
    pub media_class: MediaClass,
    pub is_corrupted: bool,
    pub is_deleted: bool,
    pub is_ignored: bool,
}

impl CatalogEntry {
    /// Build a fresh entry from an extraction result. Soft flags start unset.
    pub fn from_fingerprint(path: &str, media_class: MediaClass, fingerprint: Fingerprint) -> Self {
        let file = std::path::Path::new(path);
        let name = file
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        CatalogEntry {
            id: 0,
            path: path.to_string(),
            name,
            content_hash: fingerprint.content_hash,
            size_bytes: fingerprint.size_bytes,
            created_at: fingerprint.created_at,
            extension,
            media_class,
            is_corrupted: fingerprint.is_corrupted,
            is_deleted: false,
            is_ignored: false,
        }
    }
}

/// Output of the metadata extractor. Always produced as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub content_hash: String,
    pub size_bytes: i64,
    pub created_at: String,
    pub is_corrupted: bool,
}

/// The cheap metadata the reconciler compares against disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedState {
    pub size_bytes: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletedStats {
    pub deleted_count: i64,
    pub deleted_bytes_total: i64,
}

impl DeletedStats {
    pub fn deleted_mib(&self) -> f64 {
        self.deleted_bytes_total as f64 / 1024.0 / 1024.0
    }
}

/// A single pending mutation, applied inside a batch transaction.
#[derive(Debug, Clone)]
pub enum CatalogWrite {
    Upsert(CatalogEntry),
    Delete(String),
}

impl ToSql for MediaClass {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MediaClass {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}
