//! The `ReportStore` trait.
//!
//! Implemented by storage backends (e.g. `insee-store-sqlite`). The CLI
//! renders reports through this abstraction, not through a concrete backend.

use std::future::Future;

use crate::report::{
  CommuneEvolution, CommunePopulation, DatabaseSummary, DepartementDensity,
  DepartementSummary, IntegrityViolation, RankedCommune, RegionExtremes,
  RegionGrowth, RegionPopulation,
};

/// Read-only queries over a populated reference database.
///
/// No method mutates the store. Census years are full years (`2015`, not
/// `15`); a year with no population statistic in the catalog is an error.
pub trait ReportStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Departments of a region, matched by region code or region name,
  /// ordered by department name.
  fn departments_in_region(
    &self,
    region: &str,
  ) -> impl Future<Output = Result<Vec<DepartementSummary>, Self::Error>> + Send;

  /// Communes of a department whose latest known population is strictly
  /// greater than `min_population`, most populated first.
  fn communes_above_population(
    &self,
    departement: &str,
    min_population: f64,
  ) -> impl Future<Output = Result<Vec<CommunePopulation>, Self::Error>> + Send;

  /// Regional population growth between two census years, fastest first.
  fn population_growth(
    &self,
    start_year: i32,
    end_year: i32,
  ) -> impl Future<Output = Result<Vec<RegionGrowth>, Self::Error>> + Send;

  /// The most and the least populated regions.
  fn region_extremes(
    &self,
  ) -> impl Future<Output = Result<RegionExtremes, Self::Error>> + Send;

  /// The `limit` most populated communes at a census year.
  fn top_communes(
    &self,
    year: i32,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<RankedCommune>, Self::Error>> + Send;

  /// Population of every region at a census year, most populated first.
  fn population_by_region(
    &self,
    year: i32,
  ) -> impl Future<Output = Result<Vec<RegionPopulation>, Self::Error>> + Send;

  /// The `limit` communes with the largest relative change between two
  /// census years.
  fn commune_evolution(
    &self,
    start_year: i32,
    end_year: i32,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<CommuneEvolution>, Self::Error>> + Send;

  /// The `limit` densest departments (inhabitants per km²).
  fn departement_density(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<DepartementDensity>, Self::Error>> + Send;

  // ── Verification ──────────────────────────────────────────────────────

  /// Row counts and a sample of region seats.
  fn summary(&self) -> impl Future<Output = Result<DatabaseSummary, Self::Error>> + Send;

  /// Every broken reference between tables; empty when consistent.
  fn integrity_check(
    &self,
  ) -> impl Future<Output = Result<Vec<IntegrityViolation>, Self::Error>> + Send;
}
