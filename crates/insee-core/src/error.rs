//! Error types for `insee-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid region code: {0:?}")]
  InvalidRegionCode(String),

  #[error("invalid department code: {0:?}")]
  InvalidDepartementCode(String),

  #[error("invalid commune code: {0:?}")]
  InvalidCommuneCode(String),

  #[error("unknown commune type: {0:?}")]
  UnknownCommuneKind(String),

  #[error("not a number: {0:?}")]
  InvalidNumber(String),

  #[error("no census population is recorded for year {0}")]
  UnknownCensusYear(i32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
