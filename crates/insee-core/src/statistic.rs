//! Statistic types and the catalog of columns read from the INSEE historical
//! series file (`base-cc-serie-historique`).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use self::StatisticKind::{Births, Deaths, Dwellings, Population, Surface};

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// What a statistic measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticKind {
  Population,
  Surface,
  Dwellings,
  Births,
  Deaths,
}

/// One statistic column of the historical series file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticDef {
  /// Column header in the CSV file, also the unique `type_statistique.nom`.
  pub code:        &'static str,
  pub description: &'static str,
  pub kind:        StatisticKind,
  /// Census year, or the first year of a period.
  pub year:        Option<i32>,
  /// Last year of a period (births, deaths).
  pub end_year:    Option<i32>,
}

const fn census(
  code: &'static str,
  description: &'static str,
  kind: StatisticKind,
  year: i32,
) -> StatisticDef {
  StatisticDef { code, description, kind, year: Some(year), end_year: None }
}

const fn period(
  code: &'static str,
  description: &'static str,
  kind: StatisticKind,
  start: i32,
  end: i32,
) -> StatisticDef {
  StatisticDef { code, description, kind, year: Some(start), end_year: Some(end) }
}

/// Every statistic loaded from the historical series file.
pub const CATALOG: &[StatisticDef] = &[
  census("P21_POP", "Population en 2021", Population, 2021),
  census("P15_POP", "Population en 2015", Population, 2015),
  census("P10_POP", "Population en 2010", Population, 2010),
  census("D99_POP", "Population en 1999", Population, 1999),
  census("D90_POP", "Population en 1990", Population, 1990),
  census("D82_POP", "Population en 1982", Population, 1982),
  census("D75_POP", "Population en 1975", Population, 1975),
  census("D68_POP", "Population en 1968", Population, 1968),
  StatisticDef {
    code:        "SUPERF",
    description: "Superficie en km²",
    kind:        Surface,
    year:        None,
    end_year:    None,
  },
  census("P21_LOG", "Logements en 2021", Dwellings, 2021),
  census("P15_LOG", "Logements en 2015", Dwellings, 2015),
  census("P10_LOG", "Logements en 2010", Dwellings, 2010),
  census("D99_LOG", "Logements en 1999", Dwellings, 1999),
  census("D90_LOG", "Logements en 1990", Dwellings, 1990),
  census("D82_LOG", "Logements en 1982", Dwellings, 1982),
  census("D75_LOG", "Logements en 1975", Dwellings, 1975),
  census("D68_LOG", "Logements en 1968", Dwellings, 1968),
  period("NAIS1520", "Naissances 2015-2020", Births, 2015, 2020),
  period("NAIS1014", "Naissances 2010-2014", Births, 2010, 2014),
  period("NAIS9909", "Naissances 1999-2009", Births, 1999, 2009),
  period("NAIS9099", "Naissances 1990-1999", Births, 1990, 1999),
  period("NAIS8290", "Naissances 1982-1990", Births, 1982, 1990),
  period("NAIS7582", "Naissances 1975-1982", Births, 1975, 1982),
  period("NAIS6875", "Naissances 1968-1975", Births, 1968, 1975),
  period("DECE1520", "Décès 2015-2020", Deaths, 2015, 2020),
  period("DECE1014", "Décès 2010-2014", Deaths, 2010, 2014),
  period("DECE9909", "Décès 1999-2009", Deaths, 1999, 2009),
  period("DECE9099", "Décès 1990-1999", Deaths, 1990, 1999),
  period("DECE8290", "Décès 1982-1990", Deaths, 1982, 1990),
  period("DECE7582", "Décès 1975-1982", Deaths, 1975, 1982),
  period("DECE6875", "Décès 1968-1975", Deaths, 1968, 1975),
];

/// Code of the surface statistic, used by the density report.
pub const SURFACE_CODE: &str = "SUPERF";

/// Census year used when a report is not given one.
pub const LATEST_CENSUS: i32 = 2021;

/// Population statistic code for a census year (`2015` → `"P15_POP"`).
pub fn population_code(year: i32) -> Result<&'static str> {
  CATALOG
    .iter()
    .find(|d| d.kind == StatisticKind::Population && d.year == Some(year))
    .map(|d| d.code)
    .ok_or(Error::UnknownCensusYear(year))
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// Parse a numeric cell.
///
/// Returns `Ok(None)` for an empty cell (missing data) and an error for text
/// that is not a finite number. A comma is accepted as decimal separator.
pub fn parse_value(raw: &str) -> Result<Option<f64>> {
  let s = raw.trim();
  if s.is_empty() {
    return Ok(None);
  }
  s.replace(',', ".")
    .parse::<f64>()
    .ok()
    .filter(|v| v.is_finite())
    .map(Some)
    .ok_or_else(|| Error::InvalidNumber(raw.to_owned()))
}
