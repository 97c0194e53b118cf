//! Error type for `insee-store-sqlite`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] insee_core::Error),

  #[error("csv error: {0}")]
  Csv(#[from] insee_csv::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("input file not found: {0:?}")]
  MissingFile(PathBuf),

  /// A reference file row with a malformed code or missing field.
  #[error("{file}:{line}: {source}")]
  Record {
    file:   String,
    line:   u64,
    #[source]
    source: insee_core::Error,
  },

  #[error("{count} row(s) of {table} reference a missing parent")]
  ForeignKeyViolation { table: &'static str, count: usize },

  #[error("integrity checks cannot be suspended inside an open transaction")]
  TransactionOpen,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
