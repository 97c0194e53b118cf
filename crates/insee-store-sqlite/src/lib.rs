//! SQLite backend for the INSEE reference database.
//!
//! Owns the schema, the bulk loader and the report queries. Wraps
//! [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod guard;
mod import;
mod reports;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use import::{ImportFiles, ImportReport, RowWarning, Step, StepReport};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
