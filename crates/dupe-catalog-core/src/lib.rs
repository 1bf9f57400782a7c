pub mod analysis;
pub mod catalog;
pub mod config;
pub mod error;
pub mod extractor;
pub mod media;
pub mod progress;
pub mod scanner;
pub mod storage;
pub mod sync;

pub use analysis::grouping::{DuplicateGroup, GroupQuery};
pub use catalog::Catalog;
pub use config::AppConfig;
pub use error::Error;
pub use media::{MediaClass, MediaScope};
pub use progress::{ProgressReporter, SilentReporter};
pub use sync::{SyncEngine, SyncMode, SyncPhase, SyncReport};
