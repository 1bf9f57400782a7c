use crate::error::Error;
use crate::media::{MediaClass, MediaScope};
use crate::storage::{CatalogEntry, Database};
use glob::{MatchOptions, Pattern};
use tracing::debug;

/// How duplicates are looked up.
#[derive(Debug, Clone)]
pub struct GroupQuery {
    pub classes: Vec<MediaClass>,
    /// Add `created_at` to the equivalence key.
    pub use_creation_time: bool,
    pub include_deleted: bool,
    pub include_ignored: bool,
    /// Keep only groups with at least one member matching this glob.
    pub path_filter: Option<String>,
}

impl GroupQuery {
    pub fn for_scope(scope: MediaScope) -> Self {
        Self {
            classes: scope.classes(),
            use_creation_time: true,
            include_deleted: false,
            include_ignored: false,
            path_filter: None,
        }
    }

    pub fn use_creation_time(mut self, enabled: bool) -> Self {
        self.use_creation_time = enabled;
        self
    }

    pub fn include_deleted(mut self, enabled: bool) -> Self {
        self.include_deleted = enabled;
        self
    }

    pub fn include_ignored(mut self, enabled: bool) -> Self {
        self.include_ignored = enabled;
        self
    }

    pub fn with_path_filter(mut self, filter: impl Into<String>) -> Self {
        self.path_filter = Some(filter.into());
        self
    }
}

/// Entries considered identical under the active equivalence key.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub content_hash: String,
    pub size_bytes: i64,
    pub media_class: MediaClass,
    /// Set only when creation time is part of the key.
    pub created_at: Option<String>,
    pub entries: Vec<CatalogEntry>,
}

impl DuplicateGroup {
    fn from_entries(entries: Vec<CatalogEntry>, use_creation_time: bool) -> Option<Self> {
        let head = entries.first()?.clone();
        Some(Self {
            content_hash: head.content_hash,
            size_bytes: head.size_bytes,
            media_class: head.media_class,
            created_at: use_creation_time.then_some(head.created_at),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes reclaimable by keeping a single copy.
    pub fn wasted_bytes(&self) -> i64 {
        self.size_bytes * (self.entries.len() as i64 - 1).max(0)
    }
}

/// Case-insensitive glob over full paths. Text without wildcards is
/// treated as a prefix.
#[derive(Debug, Clone)]
pub struct PathFilter {
    pattern: Pattern,
}

impl PathFilter {
    pub fn new(raw: &str) -> Result<Self, Error> {
        let mut text = raw.trim().to_lowercase();
        if !text.contains('*') && !text.contains('?') {
            text.push('*');
        }
        let pattern = Pattern::new(&text)
            .map_err(|e| Error::InvalidPolicy(format!("bad path filter '{}': {}", raw, e)))?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, path: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.pattern.matches_with(&path.to_lowercase(), options)
    }

    pub fn matches_group(&self, group: &DuplicateGroup) -> bool {
        group.entries.iter().any(|entry| self.matches(&entry.path))
    }
}

/// Duplicate groups under `query`, largest reclaimable space first.
/// Deleted/ignored filtering happens before grouping, so every returned
/// group has at least two surviving members.
pub fn group(db: &Database, query: &GroupQuery) -> Result<Vec<DuplicateGroup>, Error> {
    if query.classes.is_empty() {
        return Err(Error::InvalidPolicy(
            "at least one media class is required".to_string(),
        ));
    }
    let filter = query.path_filter.as_deref().map(PathFilter::new).transpose()?;

    let candidates = db.query_group_candidates(
        &query.classes,
        query.use_creation_time,
        query.include_deleted,
        query.include_ignored,
    )?;

    let mut groups: Vec<DuplicateGroup> = candidates
        .into_iter()
        .filter(|entries| entries.len() >= 2)
        .filter_map(|entries| DuplicateGroup::from_entries(entries, query.use_creation_time))
        .filter(|group| filter.as_ref().map_or(true, |f| f.matches_group(group)))
        .collect();

    groups.sort_by(|a, b| {
        b.wasted_bytes()
            .cmp(&a.wasted_bytes())
            .then_with(|| a.content_hash.cmp(&b.content_hash))
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    debug!(
        "{} duplicate groups for {:?} (creation time {})",
        groups.len(),
        query.classes,
        if query.use_creation_time { "on" } else { "off" }
    );
    Ok(groups)
}

/// Entries whose image content failed to decode.
pub fn corrupted_entries(db: &Database, scope: MediaScope) -> Result<Vec<CatalogEntry>, Error> {
    let classes = scope.corruption_classes();
    if classes.is_empty() {
        return Err(Error::InvalidPolicy(format!(
            "{:?} carry no corruption flag",
            scope
        )));
    }
    Ok(db.query_corrupted(&classes)?)
}

/// The corrupted view as groups: one singleton per entry, never matched
/// against each other.
pub fn corrupted_view(db: &Database, scope: MediaScope) -> Result<Vec<DuplicateGroup>, Error> {
    Ok(corrupted_entries(db, scope)?
        .into_iter()
        .filter_map(|entry| DuplicateGroup::from_entries(vec![entry], false))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_filter_appends_wildcard() {
        let filter = PathFilter::new("/Photos/2020").unwrap();
        assert!(filter.matches("/photos/2020/beach.jpg"));
        assert!(filter.matches("/PHOTOS/2020-summer/x.png"));
        assert!(!filter.matches("/archive/photos/2020/a.jpg"));
    }

    #[test]
    fn test_path_filter_keeps_explicit_globs() {
        let filter = PathFilter::new("*.PNG").unwrap();
        assert!(filter.matches("/a/b/c.png"));
        assert!(!filter.matches("/a/b/c.png.bak"));
    }

    #[test]
    fn test_invalid_path_filter_is_policy_error() {
        assert!(matches!(
            PathFilter::new("[unclosed"),
            Err(Error::InvalidPolicy(_))
        ));
    }
}
