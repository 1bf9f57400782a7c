use super::models::*;
use super::sqlite::Database;
use crate::media::MediaClass;
use rusqlite::{params, params_from_iter, OptionalExtension, Result, Row};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const ENTRY_COLUMNS: &str = "id, path, name, content_hash, size_bytes, created_at, extension, \
                             media_class, is_corrupted, is_deleted, is_ignored";

fn entry_from_row(row: &Row) -> Result<CatalogEntry> {
    Ok(CatalogEntry {
        id: row.get("id")?,
        path: row.get("path")?,
        name: row.get("name")?,
        content_hash: row.get("content_hash")?,
        size_bytes: row.get("size_bytes")?,
        created_at: row.get("created_at")?,
        extension: row.get("extension")?,
        media_class: row.get("media_class")?,
        is_corrupted: row.get::<_, Option<bool>>("is_corrupted")?.unwrap_or(false),
        is_deleted: row.get::<_, Option<bool>>("is_deleted")?.unwrap_or(false),
        is_ignored: row.get::<_, Option<bool>>("is_ignored")?.unwrap_or(false),
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// WHERE fragment shared by the grouping subquery and the outer select.
fn candidate_filter(
    alias: &str,
    class_count: usize,
    include_deleted: bool,
    include_ignored: bool,
) -> String {
    let mut filter = format!(
        "{a}.media_class IN ({}) AND {a}.is_corrupted = 0",
        placeholders(class_count),
        a = alias
    );
    if !include_deleted {
        filter.push_str(&format!(" AND {}.is_deleted = 0", alias));
    }
    if !include_ignored {
        filter.push_str(&format!(" AND {}.is_ignored = 0", alias));
    }
    filter
}

impl Database {
    // ── Writes ───────────────────────────────────────────────────

    /// Insert, or update every non-flag field of the entry at the same path.
    pub fn upsert_entry(&self, entry: &CatalogEntry) -> Result<()> {
        self.apply_writes(std::slice::from_ref(&CatalogWrite::Upsert(entry.clone())))?;
        Ok(())
    }

    /// Apply a batch of writes in one transaction. Either every write
    /// lands or none does.
    pub fn apply_writes(&self, writes: &[CatalogWrite]) -> Result<usize> {
        if writes.is_empty() {
            return Ok(0);
        }
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut upsert_stmt = tx.prepare_cached(
                "INSERT INTO catalog_entry \
                 (path, name, content_hash, size_bytes, created_at, extension, media_class, \
                  is_corrupted, is_deleted, is_ignored) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                 ON CONFLICT(path) DO UPDATE SET \
                     name = excluded.name, \
                     content_hash = excluded.content_hash, \
                     size_bytes = excluded.size_bytes, \
                     created_at = excluded.created_at, \
                     extension = excluded.extension, \
                     media_class = excluded.media_class, \
                     is_corrupted = excluded.is_corrupted",
            )?;
            let mut delete_stmt =
                tx.prepare_cached("DELETE FROM catalog_entry WHERE path = ?1")?;

            for write in writes {
                count += match write {
                    CatalogWrite::Upsert(entry) => upsert_stmt.execute(params![
                        entry.path,
                        entry.name,
                        entry.content_hash,
                        entry.size_bytes,
                        entry.created_at,
                        entry.extension,
                        entry.media_class,
                        entry.is_corrupted,
                        entry.is_deleted,
                        entry.is_ignored,
                    ])?,
                    CatalogWrite::Delete(path) => delete_stmt.execute(params![path])?,
                };
            }
        }
        tx.commit()?;
        debug!("Committed batch of {} catalog writes", count);
        Ok(count)
    }

    /// Hard delete, used when a file vanished from disk.
    pub fn delete_by_path(&self, path: &str) -> Result<bool> {
        let removed = self
            .connection()
            .execute("DELETE FROM catalog_entry WHERE path = ?1", params![path])?;
        Ok(removed > 0)
    }

    // ── Soft flags ───────────────────────────────────────────────

    /// Set the deleted flag. Missing paths are a no-op and return false.
    pub fn set_deleted(&self, path: &str) -> Result<bool> {
        let updated = self.connection().execute(
            "UPDATE catalog_entry SET is_deleted = 1 WHERE path = ?1",
            params![path],
        )?;
        Ok(updated > 0)
    }

    /// Flip the ignored flag and return its new value, or None when the
    /// path is not catalogued. A NULL flag counts as "not ignored".
    pub fn toggle_ignored(&self, path: &str) -> Result<Option<bool>> {
        let tx = self.connection().unchecked_transaction()?;
        let current: Option<Option<bool>> = tx
            .query_row(
                "SELECT is_ignored FROM catalog_entry WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;

        let next = match current {
            Some(flag) => !flag.unwrap_or(false),
            None => return Ok(None),
        };
        tx.execute(
            "UPDATE catalog_entry SET is_ignored = ?1 WHERE path = ?2",
            params![next, path],
        )?;
        tx.commit()?;
        Ok(Some(next))
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn get_entry(&self, path: &str) -> Result<Option<CatalogEntry>> {
        self.connection()
            .query_row(
                &format!("SELECT {} FROM catalog_entry WHERE path = ?1", ENTRY_COLUMNS),
                params![path],
                entry_from_row,
            )
            .optional()
    }

    pub fn count_entries(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM catalog_entry", [], |row| row.get(0))
    }

    pub fn all_paths(&self) -> Result<HashSet<String>> {
        let mut stmt = self.connection().prepare("SELECT path FROM catalog_entry")?;
        let paths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<String>>>()?;
        Ok(paths)
    }

    /// Size and creation time of every entry, keyed by path.
    pub fn indexed_states(&self) -> Result<HashMap<String, IndexedState>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT path, size_bytes, created_at FROM catalog_entry")?;
        let states = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    IndexedState {
                        size_bytes: row.get(1)?,
                        created_at: row.get(2)?,
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(states)
    }

    /// Entries sharing `(content_hash, size_bytes, media_class)`, plus
    /// `created_at` when requested, with at least two members after the
    /// deleted/ignored filters. Corrupted entries never take part.
    /// Groups come back in key order, members in path order.
    pub fn query_group_candidates(
        &self,
        media_classes: &[MediaClass],
        include_creation_time: bool,
        include_deleted: bool,
        include_ignored: bool,
    ) -> Result<Vec<Vec<CatalogEntry>>> {
        if media_classes.is_empty() {
            return Ok(Vec::new());
        }

        let key_columns = if include_creation_time {
            "content_hash, size_bytes, media_class, created_at"
        } else {
            "content_hash, size_bytes, media_class"
        };
        let mut join = "f.content_hash = g.content_hash AND f.size_bytes = g.size_bytes \
                        AND f.media_class = g.media_class"
            .to_string();
        if include_creation_time {
            join.push_str(" AND f.created_at = g.created_at");
        }
        let order = key_columns
            .split(", ")
            .map(|c| format!("f.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        let columns = ENTRY_COLUMNS
            .split(", ")
            .map(|c| format!("f.{}", c))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "SELECT {columns} FROM catalog_entry f \
             JOIN (SELECT {key} FROM catalog_entry c WHERE {inner} \
                   GROUP BY {key} HAVING COUNT(*) > 1) g ON {join} \
             WHERE {outer} \
             ORDER BY {order}, f.path",
            columns = columns,
            key = key_columns,
            inner = candidate_filter("c", media_classes.len(), include_deleted, include_ignored),
            join = join,
            outer = candidate_filter("f", media_classes.len(), include_deleted, include_ignored),
            order = order,
        );

        let bind: Vec<MediaClass> = media_classes
            .iter()
            .chain(media_classes.iter())
            .copied()
            .collect();

        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(bind.iter()), entry_from_row)?
            .collect::<Result<Vec<_>>>()?;

        let mut groups: Vec<Vec<CatalogEntry>> = Vec::new();
        for entry in rows {
            let same_key = groups.last().and_then(|g| g.first()).map_or(false, |head| {
                head.content_hash == entry.content_hash
                    && head.size_bytes == entry.size_bytes
                    && head.media_class == entry.media_class
                    && (!include_creation_time || head.created_at == entry.created_at)
            });
            match groups.last_mut() {
                Some(group) if same_key => group.push(entry),
                _ => groups.push(vec![entry]),
            }
        }
        debug!("{} duplicate candidate groups", groups.len());
        Ok(groups)
    }

    pub fn query_corrupted(&self, media_classes: &[MediaClass]) -> Result<Vec<CatalogEntry>> {
        if media_classes.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM catalog_entry \
             WHERE is_corrupted = 1 AND media_class IN ({}) ORDER BY path",
            ENTRY_COLUMNS,
            placeholders(media_classes.len())
        ))?;
        let entries = stmt
            .query_map(params_from_iter(media_classes.iter()), entry_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn aggregate_deleted(&self) -> Result<DeletedStats> {
        self.connection().query_row(
            "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0) \
             FROM catalog_entry WHERE is_deleted = 1",
            [],
            |row| {
                Ok(DeletedStats {
                    deleted_count: row.get(0)?,
                    deleted_bytes_total: row.get(1)?,
                })
            },
        )
    }
}
