use super::timestamp::{normalize_exif_datetime, normalize_video_timestamp};
use crate::error::ProbeError;
use exif::{In, Tag, Value};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

const PROBE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Codec-backed questions the extractor needs answered.
pub trait MediaProbe: Send + Sync {
    /// Whether the image decodes cleanly.
    fn probe_image(&self, path: &Path) -> bool;

    /// Embedded "date/time original", canonicalized.
    fn image_capture_time(&self, path: &Path) -> Option<String>;

    /// Container-level creation time, bounded by `timeout`.
    fn probe_video_creation_time(
        &self,
        path: &Path,
        timeout: Duration,
    ) -> Result<Option<String>, ProbeError>;
}

/// `image` for decoding, `kamadak-exif` for capture time, `ffprobe` for video.
#[derive(Debug, Clone)]
pub struct NativeProbe {
    ffprobe_path: String,
}

impl NativeProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Default for NativeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    creation_time: Option<String>,
}

impl MediaProbe for NativeProbe {
    fn probe_image(&self, path: &Path) -> bool {
        let decoded = image::io::Reader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| e.to_string())
            .and_then(|reader| reader.decode().map_err(|e| e.to_string()));
        match decoded {
            Ok(_) => true,
            Err(e) => {
                trace!("{} failed to decode: {}", path.display(), e);
                false
            }
        }
    }

    fn image_capture_time(&self, path: &Path) -> Option<String> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        let exif = exif::Reader::new()
            .read_from_container(&mut reader)
            .ok()?;
        let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(parts) => parts
                .iter()
                .filter_map(|raw| std::str::from_utf8(raw).ok())
                .find_map(normalize_exif_datetime),
            _ => None,
        }
    }

    fn probe_video_creation_time(
        &self,
        path: &Path,
        timeout: Duration,
    ) -> Result<Option<String>, ProbeError> {
        let mut child = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "format_tags=creation_time",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(ProbeError::Spawn)?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().map_err(ProbeError::Spawn)? {
                break status;
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProbeError::Timeout(timeout));
            }
            thread::sleep(PROBE_POLL_INTERVAL);
        };

        if !status.success() {
            return Err(ProbeError::Failed(status.code()));
        }

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout).map_err(ProbeError::Spawn)?;
        }
        let parsed: FfprobeOutput = serde_json::from_str(&stdout)?;
        Ok(parsed
            .format
            .tags
            .creation_time
            .as_deref()
            .and_then(normalize_video_timestamp))
    }
}
