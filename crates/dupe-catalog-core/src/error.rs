use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid grouping policy: {0}")]
    InvalidPolicy(String),

    #[error("{0}")]
    Other(String),
}

/// Failure to fingerprint a single file. Never aborts a run; the file is
/// left out of the catalog and retried next time.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} has no recognized media extension")]
    UnknownMediaClass { path: PathBuf },
}

impl ExtractionError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Failure of the external video metadata probe. Treated as "no signal".
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to spawn probe: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("probe exited with status {0:?}")]
    Failed(Option<i32>),

    #[error("unparseable probe output: {0}")]
    Parse(#[from] serde_json::Error),
}
