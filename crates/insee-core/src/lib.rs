//! Domain model of the INSEE geographic reference: regions, departments,
//! communes, the statistic catalog and the report row types.
//!
//! No CSV or SQL here. `insee-csv` decodes files into these types,
//! `insee-store-sqlite` persists them and implements [`store::ReportStore`].

pub mod error;
pub mod geo;
pub mod report;
pub mod statistic;
pub mod store;

pub use error::{Error, Result};
