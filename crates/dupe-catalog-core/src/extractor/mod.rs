pub mod hash;
pub mod probe;
pub mod timestamp;

pub use probe::{MediaProbe, NativeProbe};

use crate::error::ExtractionError;
use crate::media::MediaClass;
use crate::storage::{Fingerprint, IndexedState};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Computes fingerprints. Cheap observation (size and creation-time
/// heuristic) is split from the expensive part (hash and corruption probe)
/// so the reconciler can skip the latter for unchanged files.
#[derive(Clone)]
pub struct Extractor {
    probe: Arc<dyn MediaProbe>,
    probe_timeout: Duration,
}

impl Extractor {
    pub fn new(probe: Arc<dyn MediaProbe>, probe_timeout: Duration) -> Self {
        Self {
            probe,
            probe_timeout,
        }
    }

    /// Size on disk and the creation time the heuristics currently report.
    pub fn observe(
        &self,
        path: &Path,
        media_class: MediaClass,
    ) -> Result<IndexedState, ExtractionError> {
        let metadata = fs::metadata(path).map_err(|e| ExtractionError::io(path, e))?;
        let created_at = timestamp::resolve_created_at(
            path,
            media_class,
            &metadata,
            self.probe.as_ref(),
            self.probe_timeout,
        );
        Ok(IndexedState {
            size_bytes: metadata.len() as i64,
            created_at,
        })
    }

    /// Finish a fingerprint from an observation already taken.
    pub fn complete(
        &self,
        path: &Path,
        media_class: MediaClass,
        observed: IndexedState,
    ) -> Result<Fingerprint, ExtractionError> {
        let content_hash = hash::content_hash(path).map_err(|e| ExtractionError::io(path, e))?;
        let is_corrupted = match media_class {
            MediaClass::Image => !self.probe.probe_image(path),
            MediaClass::Video | MediaClass::Document => false,
        };
        Ok(Fingerprint {
            content_hash,
            size_bytes: observed.size_bytes,
            created_at: observed.created_at,
            is_corrupted,
        })
    }

    pub fn extract(&self, path: &Path) -> Result<Fingerprint, ExtractionError> {
        let media_class = MediaClass::from_path(path).ok_or_else(|| {
            ExtractionError::UnknownMediaClass {
                path: path.to_path_buf(),
            }
        })?;
        let observed = self.observe(path, media_class)?;
        self.complete(path, media_class, observed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use std::fs;
    use tempfile::tempdir;

    struct FixedProbe;

    impl MediaProbe for FixedProbe {
        fn probe_image(&self, path: &Path) -> bool {
            !path.to_string_lossy().contains("broken")
        }

        fn image_capture_time(&self, _path: &Path) -> Option<String> {
            Some("2001-02-03 04:05:06".to_string())
        }

        fn probe_video_creation_time(
            &self,
            _path: &Path,
            timeout: Duration,
        ) -> Result<Option<String>, ProbeError> {
            Err(ProbeError::Timeout(timeout))
        }
    }

    fn extractor() -> Extractor {
        Extractor::new(Arc::new(FixedProbe), Duration::from_millis(10))
    }

    #[test]
    fn test_image_uses_capture_time_and_corruption_probe() {
        let tmp = tempdir().unwrap();
        let good = tmp.path().join("good.jpg");
        let broken = tmp.path().join("broken.jpg");
        fs::write(&good, b"same bytes").unwrap();
        fs::write(&broken, b"same bytes").unwrap();

        let a = extractor().extract(&good).unwrap();
        let b = extractor().extract(&broken).unwrap();
        assert_eq!(a.created_at, "2001-02-03 04:05:06");
        assert_eq!(a.size_bytes, 10);
        assert!(!a.is_corrupted);
        assert!(b.is_corrupted);
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_video_probe_timeout_falls_back_to_filesystem() {
        let tmp = tempdir().unwrap();
        let clip = tmp.path().join("broken_name_but_video.mp4");
        fs::write(&clip, b"not decoded").unwrap();

        let fp = extractor().extract(&clip).unwrap();
        assert!(timestamp::is_canonical(&fp.created_at));
        assert_ne!(fp.created_at, "2001-02-03 04:05:06");
        assert!(!fp.is_corrupted, "videos are never probed for corruption");
    }

    #[test]
    fn test_missing_file_is_an_extraction_error() {
        let tmp = tempdir().unwrap();
        let result = extractor().extract(&tmp.path().join("gone.png"));
        assert!(matches!(result, Err(ExtractionError::Io { .. })));
    }
}
