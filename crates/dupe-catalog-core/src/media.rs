use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Formats the `image` decoder can verify. Anything else would always
/// read as corrupted.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff"];
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "mpeg", "mpg", "webm", "m4v", "3gp",
];
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "odt", "ods", "odp", "rtf",
    "csv",
];

/// Classification derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaClass {
    Image,
    Video,
    Document,
}

impl MediaClass {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaClass::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaClass::Video)
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaClass::Document)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaClass::Image => "image",
            MediaClass::Video => "video",
            MediaClass::Document => "document",
        }
    }
}

impl fmt::Display for MediaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaClass::Image),
            "video" => Ok(MediaClass::Video),
            "document" => Ok(MediaClass::Document),
            other => Err(format!("unknown media class '{}'", other)),
        }
    }
}

/// Which media classes a query looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaScope {
    #[default]
    Images,
    Videos,
    Documents,
    All,
}

impl MediaScope {
    pub fn classes(&self) -> Vec<MediaClass> {
        match self {
            MediaScope::Images => vec![MediaClass::Image],
            MediaScope::Videos => vec![MediaClass::Video],
            MediaScope::Documents => vec![MediaClass::Document],
            MediaScope::All => vec![MediaClass::Image, MediaClass::Video, MediaClass::Document],
        }
    }

    /// Classes that carry a corruption flag. Documents are never probed.
    pub fn corruption_classes(&self) -> Vec<MediaClass> {
        match self {
            MediaScope::Images => vec![MediaClass::Image],
            MediaScope::Videos => vec![MediaClass::Video],
            MediaScope::Documents => vec![],
            MediaScope::All => vec![MediaClass::Image, MediaClass::Video],
        }
    }
}

impl FromStr for MediaScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "images" | "image" => Ok(MediaScope::Images),
            "videos" | "video" => Ok(MediaScope::Videos),
            "documents" | "document" | "docs" => Ok(MediaScope::Documents),
            "all" => Ok(MediaScope::All),
            other => Err(format!(
                "unknown scope '{}' (expected images, videos, documents or all)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(
            MediaClass::from_path(Path::new("/a/IMG_0001.JPG")),
            Some(MediaClass::Image)
        );
        assert_eq!(
            MediaClass::from_path(Path::new("/a/clip.MoV")),
            Some(MediaClass::Video)
        );
        assert_eq!(
            MediaClass::from_path(Path::new("/a/report.pdf")),
            Some(MediaClass::Document)
        );
    }

    #[test]
    fn test_unknown_extensions_are_rejected() {
        assert_eq!(MediaClass::from_path(Path::new("/a/archive.zip")), None);
        assert_eq!(MediaClass::from_path(Path::new("/a/Makefile")), None);
    }

    #[test]
    fn test_undecodable_image_formats_are_not_catalogued() {
        assert_eq!(MediaClass::from_path(Path::new("/a/IMG_0002.HEIC")), None);
        assert_eq!(MediaClass::from_extension("heic"), None);
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("Videos".parse::<MediaScope>(), Ok(MediaScope::Videos));
        assert_eq!("all".parse::<MediaScope>().unwrap().classes().len(), 3);
        assert!("music".parse::<MediaScope>().is_err());
    }

    #[test]
    fn test_corruption_scope_never_includes_documents() {
        assert!(MediaScope::Documents.corruption_classes().is_empty());
        assert!(!MediaScope::All
            .corruption_classes()
            .contains(&MediaClass::Document));
    }
}
