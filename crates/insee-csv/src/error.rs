//! Error types for the insee-csv codec.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot open {path:?}: {source}")]
  Open {
    path:   PathBuf,
    #[source]
    source: csv::Error,
  },

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("missing column {column:?}")]
  MissingColumn { column: &'static str },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
