//! Codec for the INSEE reference files.
//!
//! Reads the COG files (regions, departments, communes), an optional
//! commune population file and the wide historical statistics file into
//! typed records. Pure synchronous; no database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use insee_csv::{RegionRecord, Records};
//!
//! for row in Records::<RegionRecord, _>::from_path("v_region_2024.csv").unwrap() {
//!   let (line, record) = row.unwrap();
//!   println!("{line}: {} {}", record.reg, record.libelle);
//! }
//! ```

pub mod error;
mod records;
mod statistics;

pub use error::{Error, Result};
pub use records::{
  CommuneRecord, DepartementRecord, PopulationRecord, Records, ReferenceRecord,
  RegionRecord,
};
pub use statistics::{StatisticCell, StatisticsReader, StatisticsRow};

/// Field separator of the COG reference files.
pub const COG_DELIMITER: u8 = b',';

/// Field separator of the historical statistics file.
pub const STATISTICS_DELIMITER: u8 = b';';
