//! Reader for the historical statistics file.
//!
//! The file is semicolon-separated with one row per commune (`CODGEO`) and
//! one column per statistic code (`P21_POP`, `SUPERF`, `NAIS1520`, …).
//! Columns that are not in the catalog are ignored.

use std::{fs::File, io, path::Path};

use csv::{ReaderBuilder, StringRecord, Trim};
use insee_core::{
  geo::normalize_commune_code,
  statistic::{StatisticDef, CATALOG},
};

use crate::{Error, Result, STATISTICS_DELIMITER};

const CODE_COLUMN: &str = "CODGEO";

/// One catalog column of a row, unparsed.
#[derive(Debug, Clone)]
pub struct StatisticCell {
  pub def: &'static StatisticDef,
  pub raw: String,
}

/// One commune of the statistics file.
#[derive(Debug, Clone)]
pub struct StatisticsRow {
  pub line:     u64,
  /// `CODGEO` as written in the file; leading zeros may be missing.
  pub raw_code: String,
  pub cells:    Vec<StatisticCell>,
}

impl StatisticsRow {
  /// The commune code zero-padded to five characters.
  pub fn commune_code(&self) -> insee_core::Result<String> {
    normalize_commune_code(&self.raw_code)
  }
}

pub struct StatisticsReader<R> {
  reader:      csv::Reader<R>,
  record:      StringRecord,
  code_column: usize,
  columns:     Vec<(&'static StatisticDef, usize)>,
  missing:     Vec<&'static str>,
}

impl StatisticsReader<File> {
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let reader = builder()
      .from_path(path)
      .map_err(|source| Error::Open { path: path.to_path_buf(), source })?;
    Self::from_csv(reader)
  }
}

impl<R: io::Read> StatisticsReader<R> {
  pub fn new(input: R) -> Result<Self> { Self::from_csv(builder().from_reader(input)) }

  fn from_csv(mut reader: csv::Reader<R>) -> Result<Self> {
    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let code_column =
      position(CODE_COLUMN).ok_or(Error::MissingColumn { column: CODE_COLUMN })?;

    let mut columns = Vec::new();
    let mut missing = Vec::new();
    for def in CATALOG {
      match position(def.code) {
        Some(idx) => columns.push((def, idx)),
        None => missing.push(def.code),
      }
    }

    Ok(Self { reader, record: StringRecord::new(), code_column, columns, missing })
  }

  /// Catalog statistics present in the file, in catalog order.
  pub fn columns(&self) -> impl Iterator<Item = &'static StatisticDef> + '_ {
    self.columns.iter().map(|(def, _)| *def)
  }

  /// Catalog codes with no column in the file.
  pub fn missing_columns(&self) -> &[&'static str] { &self.missing }
}

fn builder() -> ReaderBuilder {
  let mut builder = ReaderBuilder::new();
  builder.delimiter(STATISTICS_DELIMITER).flexible(true).trim(Trim::All);
  builder
}

impl<R: io::Read> Iterator for StatisticsReader<R> {
  type Item = Result<StatisticsRow>;

  fn next(&mut self) -> Option<Self::Item> {
    match self.reader.read_record(&mut self.record) {
      Ok(false) => None,
      Err(e) => Some(Err(e.into())),
      Ok(true) => {
        let field = |idx: usize| self.record.get(idx).unwrap_or_default().to_owned();
        Some(Ok(StatisticsRow {
          line:     self.record.position().map_or(0, |p| p.line()),
          raw_code: field(self.code_column),
          cells:    self
            .columns
            .iter()
            .map(|&(def, idx)| StatisticCell { def, raw: field(idx) })
            .collect(),
        }))
      }
    }
  }
}
