pub mod models;
mod queries;
mod sqlite;

pub use models::{CatalogEntry, CatalogWrite, DeletedStats, Fingerprint, IndexedState};
pub use sqlite::{Database, SCHEMA_VERSION};
