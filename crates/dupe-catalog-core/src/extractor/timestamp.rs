use super::probe::MediaProbe;
use crate::media::MediaClass;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs::Metadata;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, trace};

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const EXIF_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

pub fn is_canonical(value: &str) -> bool {
    value.len() == 19 && NaiveDateTime::parse_from_str(value, CANONICAL_FORMAT).is_ok()
}

/// EXIF `DateTimeOriginal` ("YYYY:MM:DD HH:MM:SS") to canonical form.
pub fn normalize_exif_datetime(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(trimmed, EXIF_FORMAT)
        .ok()
        .map(|dt| dt.format(CANONICAL_FORMAT).to_string())
}

/// Container `creation_time` tags come as ISO 8601, usually with fractional
/// seconds and a trailing `Z`. The wall-clock value is kept as written.
pub fn normalize_video_timestamp(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local().format(CANONICAL_FORMAT).to_string());
    }

    let bare = trimmed
        .trim_end_matches(|c: char| c == 'Z' || c == 'z')
        .replacen('T', " ", 1);
    if let Ok(dt) = NaiveDateTime::parse_from_str(&bare, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.format(CANONICAL_FORMAT).to_string());
    }

    bare.get(..19)
        .filter(|prefix| is_canonical(prefix))
        .map(str::to_string)
}

/// Creation time from the filesystem, falling back to modification time,
/// rendered in local time. Never fails.
pub fn filesystem_time(metadata: &Metadata) -> String {
    let time = metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(time)
        .format(CANONICAL_FORMAT)
        .to_string()
}

/// First heuristic that yields a value wins: embedded capture time for
/// images, container creation time for videos, then the filesystem.
pub fn resolve_created_at(
    path: &Path,
    media_class: MediaClass,
    metadata: &Metadata,
    probe: &dyn MediaProbe,
    probe_timeout: Duration,
) -> String {
    match media_class {
        MediaClass::Image => {
            if let Some(taken) = probe.image_capture_time(path) {
                trace!("{}: capture time from EXIF", path.display());
                return taken;
            }
        }
        MediaClass::Video => match probe.probe_video_creation_time(path, probe_timeout) {
            Ok(Some(created)) => {
                trace!("{}: creation time from container", path.display());
                return created;
            }
            Ok(None) => {}
            Err(e) => debug!("{}: video probe gave no timestamp: {}", path.display(), e),
        },
        MediaClass::Document => {}
    }
    filesystem_time(metadata)
}
