//! Rows returned by the read-only reports.
//!
//! Populations and surfaces are `f64` because the statistics table stores
//! generic numeric values.

use serde::{Deserialize, Serialize};

/// A department of a region with its seat commune.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartementSummary {
  pub code:      String,
  pub name:      String,
  pub chef_lieu: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunePopulation {
  pub code:       String,
  pub name:       String,
  pub population: f64,
}

/// Population change of a region between two census years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionGrowth {
  pub region:      String,
  pub pop_start:   f64,
  pub pop_end:     f64,
  /// Percent, rounded to two decimals; `None` when the start population is 0.
  pub growth_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPopulation {
  pub code:       String,
  pub name:       String,
  pub population: f64,
}

/// The most and least populated regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionExtremes {
  pub most:  Option<RegionPopulation>,
  pub least: Option<RegionPopulation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCommune {
  pub commune:     String,
  pub departement: String,
  pub population:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuneEvolution {
  pub commune:     String,
  pub departement: String,
  pub pop_start:   f64,
  pub pop_end:     f64,
  pub evolution:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartementDensity {
  pub departement: String,
  /// Inhabitants per km², rounded to two decimals.
  pub density:     f64,
}

// ─── Verification ────────────────────────────────────────────────────────────

/// Row counts per table after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
  pub regions:                 u64,
  pub departements:            u64,
  pub communes:                u64,
  pub chefs_lieux_region:      u64,
  pub chefs_lieux_departement: u64,
  pub statistic_types:         u64,
  pub statistics:              u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSeat {
  pub region_code: String,
  pub region:      String,
  pub commune:     String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSummary {
  pub counts:       TableCounts,
  /// A handful of region seats, to eyeball the chef-lieu links.
  pub sample_seats: Vec<RegionSeat>,
}

/// A row that breaks a reference between tables or a uniqueness rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityViolation {
  pub table:  String,
  pub rowid:  Option<i64>,
  pub reason: String,
}
