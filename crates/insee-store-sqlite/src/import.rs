//! The bulk loader: reference CSV files → database, in dependency order.
//!
//! Each step runs in its own transaction with a cached prepared statement.
//! Reference rows are inserted with `ON CONFLICT DO NOTHING` so a re-import
//! changes nothing. Data problems in a single row (unknown commune, text in
//! a numeric column) are recorded as [`RowWarning`]s and skipped; anything
//! that breaks a whole file rolls that step back and aborts the run.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use insee_core::{
  geo::{ChefLieu, CommuneKind},
  statistic::{parse_value, CATALOG},
};
use insee_csv::{
  CommuneRecord, DepartementRecord, PopulationRecord, Records, RegionRecord,
  StatisticsReader,
};
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{guard::ImportGuard, Error, Result};

/// Emit a progress line every this many rows of the statistics file.
const PROGRESS_EVERY: u64 = 5_000;

// ─── Inputs and outputs ──────────────────────────────────────────────────────

/// Paths of the reference files for one import.
#[derive(Debug, Clone)]
pub struct ImportFiles {
  pub regions:      PathBuf,
  pub departements: PathBuf,
  pub communes:     PathBuf,
  /// Optional `code,population` file filling `commune.population`.
  pub population:   Option<PathBuf>,
  pub statistics:   PathBuf,
}

impl ImportFiles {
  fn all(&self) -> impl Iterator<Item = &Path> {
    [&self.regions, &self.departements, &self.communes, &self.statistics]
      .into_iter()
      .map(PathBuf::as_path)
      .chain(self.population.as_deref())
  }

  /// Fail before touching the database if any input is missing.
  fn ensure_present(&self) -> Result<()> {
    match self.all().find(|p| !p.is_file()) {
      Some(missing) => Err(Error::MissingFile(missing.to_path_buf())),
      None => Ok(()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
  Regions,
  Departements,
  Communes,
  ChefsLieux,
  Population,
  StatisticTypes,
  Statistics,
}

impl Step {
  pub fn label(self) -> &'static str {
    match self {
      Self::Regions => "regions",
      Self::Departements => "departements",
      Self::Communes => "communes",
      Self::ChefsLieux => "chefs-lieux",
      Self::Population => "population",
      Self::StatisticTypes => "statistic types",
      Self::Statistics => "statistics",
    }
  }
}

/// Counters for one step. Units are rows for the reference files and
/// individual values (cells) for the statistics file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
  pub step:     Step,
  pub read:     u64,
  pub inserted: u64,
  /// Already present; left untouched.
  pub existing: u64,
  /// Rejected with a warning.
  pub skipped:  u64,
  /// Not meant to be loaded (non-commune rows, empty cells).
  pub filtered: u64,
}

impl StepReport {
  fn new(step: Step) -> Self {
    Self { step, read: 0, inserted: 0, existing: 0, skipped: 0, filtered: 0 }
  }

  /// Count the outcome of one `INSERT ... ON CONFLICT DO NOTHING`.
  fn record(&mut self, changed: usize) {
    if changed > 0 {
      self.inserted += changed as u64;
    } else {
      self.existing += 1;
    }
  }
}

/// A row skipped by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
  pub file:    String,
  pub line:    u64,
  pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
  pub steps:    Vec<StepReport>,
  pub warnings: Vec<RowWarning>,
}

impl ImportReport {
  pub fn step(&self, step: Step) -> Option<&StepReport> {
    self.steps.iter().find(|s| s.step == step)
  }

  fn warn(&mut self, path: &Path, line: u64, message: String) {
    let file = file_name(path);
    warn!(file = %file, line, "{message}");
    self.warnings.push(RowWarning { file, line, message });
  }
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn record_error(path: &Path, line: u64) -> impl FnOnce(insee_core::Error) -> Error {
  let file = file_name(path);
  move |source| Error::Record { file, line, source }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Run the whole import on `conn`, which must not be inside a transaction.
pub(crate) fn run(conn: &Connection, files: &ImportFiles) -> Result<ImportReport> {
  files.ensure_present()?;

  let mut report = ImportReport::default();
  let _guard = ImportGuard::engage(conn)?;

  load_regions(conn, &files.regions, &mut report)?;
  load_departements(conn, &files.departements, &mut report)?;
  load_communes(conn, &files.communes, &mut report)?;

  let communes = commune_ids(conn)?;
  load_chefs_lieux(conn, files, &communes, &mut report)?;
  if let Some(path) = &files.population {
    load_population(conn, path, &communes, &mut report)?;
  }
  load_statistic_types(conn, &mut report)?;
  load_statistics(conn, &files.statistics, &communes, &mut report)?;

  info!(warnings = report.warnings.len(), "import complete");
  Ok(report)
}

/// Verify the references of `tables`, then commit the step.
fn commit_step(
  tx: Transaction<'_>,
  tables: &[&'static str],
  step: StepReport,
  report: &mut ImportReport,
) -> Result<()> {
  for &table in tables {
    let count = tx
      .prepare(&format!("PRAGMA foreign_key_check({table})"))?
      .query_map([], |_| Ok(()))?
      .collect::<rusqlite::Result<Vec<()>>>()?
      .len();
    if count > 0 {
      return Err(Error::ForeignKeyViolation { table, count });
    }
  }
  tx.commit()?;

  info!(
    step = step.step.label(),
    read = step.read,
    inserted = step.inserted,
    existing = step.existing,
    skipped = step.skipped,
    filtered = step.filtered,
    "step committed"
  );
  report.steps.push(step);
  Ok(())
}

/// `code_insee` → `com_id` for every loaded commune.
fn commune_ids(conn: &Connection) -> Result<HashMap<String, i64>> {
  let mut stmt = conn.prepare("SELECT code_insee, com_id FROM commune")?;
  let map = stmt
    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<_>>()?;
  Ok(map)
}

// ─── Reference files ─────────────────────────────────────────────────────────

fn load_regions(conn: &Connection, path: &Path, report: &mut ImportReport) -> Result<()> {
  let mut step = StepReport::new(Step::Regions);
  let tx = conn.unchecked_transaction()?;
  {
    let mut insert = tx.prepare_cached(
      "INSERT INTO region (reg_id, name) VALUES (?1, ?2)
       ON CONFLICT (reg_id) DO NOTHING",
    )?;
    for row in Records::<RegionRecord, _>::from_path(path)? {
      let (line, record) = row?;
      step.read += 1;
      let region = record.region().map_err(record_error(path, line))?;
      step.record(insert.execute(params![region.code, region.name])?);
    }
  }
  commit_step(tx, &["region"], step, report)
}

fn load_departements(
  conn: &Connection,
  path: &Path,
  report: &mut ImportReport,
) -> Result<()> {
  let mut step = StepReport::new(Step::Departements);
  let tx = conn.unchecked_transaction()?;
  {
    let mut insert = tx.prepare_cached(
      "INSERT INTO departement (dep_id, name, reg_id) VALUES (?1, ?2, ?3)
       ON CONFLICT (dep_id) DO NOTHING",
    )?;
    for row in Records::<DepartementRecord, _>::from_path(path)? {
      let (line, record) = row?;
      step.read += 1;
      let dep = record.departement().map_err(record_error(path, line))?;
      step.record(insert.execute(params![dep.code, dep.name, dep.region_code])?);
    }
  }
  commit_step(tx, &["departement"], step, report)
}

fn load_communes(conn: &Connection, path: &Path, report: &mut ImportReport) -> Result<()> {
  let mut step = StepReport::new(Step::Communes);
  let tx = conn.unchecked_transaction()?;
  {
    let mut insert = tx.prepare_cached(
      "INSERT INTO commune (code_insee, name, dep_id) VALUES (?1, ?2, ?3)
       ON CONFLICT (code_insee) DO NOTHING",
    )?;
    for row in Records::<CommuneRecord, _>::from_path(path)? {
      let (line, record) = row?;
      step.read += 1;
      if record.kind().map_err(record_error(path, line))? != CommuneKind::Commune {
        step.filtered += 1;
        continue;
      }
      let commune = record.commune().map_err(record_error(path, line))?;
      step.record(insert.execute(params![
        commune.code,
        commune.name,
        commune.departement_code
      ])?);
    }
  }
  commit_step(tx, &["commune"], step, report)
}

/// Seats come from the `CHEFLIEU` column of the region and department files.
/// A re-import replaces the link rather than keeping a stale one.
fn load_chefs_lieux(
  conn: &Connection,
  files: &ImportFiles,
  communes: &HashMap<String, i64>,
  report: &mut ImportReport,
) -> Result<()> {
  let mut step = StepReport::new(Step::ChefsLieux);
  let tx = conn.unchecked_transaction()?;
  {
    let mut region_seat = tx.prepare_cached(
      "INSERT INTO chef_lieu_region (reg_id, com_id) VALUES (?1, ?2)
       ON CONFLICT (reg_id) DO UPDATE SET com_id = excluded.com_id
       WHERE com_id <> excluded.com_id",
    )?;
    let mut departement_seat = tx.prepare_cached(
      "INSERT INTO chef_lieu_departement (dep_id, com_id) VALUES (?1, ?2)
       ON CONFLICT (dep_id) DO UPDATE SET com_id = excluded.com_id
       WHERE com_id <> excluded.com_id",
    )?;

    let regions = Records::<RegionRecord, _>::from_path(&files.regions)?
      .map(|row| row.map(|(line, r)| (&files.regions, line, r.chef_lieu())));
    let departements = Records::<DepartementRecord, _>::from_path(&files.departements)?
      .map(|row| row.map(|(line, r)| (&files.departements, line, r.chef_lieu())));

    for row in regions.chain(departements) {
      let (path, line, seat) = row?;
      step.read += 1;
      let seat = match seat {
        Ok(seat) => seat,
        Err(e) => {
          step.skipped += 1;
          report.warn(path, line, format!("invalid chef-lieu: {e}"));
          continue;
        }
      };
      let Some(&com_id) = communes.get(seat.commune_code()) else {
        step.skipped += 1;
        report.warn(
          path,
          line,
          format!("chef-lieu {} is not a known commune", seat.commune_code()),
        );
        continue;
      };
      let changed = match &seat {
        ChefLieu::Region { region_code, .. } => region_seat.execute(params![region_code, com_id])?,
        ChefLieu::Departement { departement_code, .. } => {
          departement_seat.execute(params![departement_code, com_id])?
        }
      };
      step.record(changed);
    }
  }
  commit_step(tx, &["chef_lieu_region", "chef_lieu_departement"], step, report)
}

fn load_population(
  conn: &Connection,
  path: &Path,
  communes: &HashMap<String, i64>,
  report: &mut ImportReport,
) -> Result<()> {
  let mut step = StepReport::new(Step::Population);
  let tx = conn.unchecked_transaction()?;
  {
    let mut update = tx.prepare_cached(
      "UPDATE commune SET population = ?1 WHERE com_id = ?2 AND population IS NOT ?1",
    )?;
    for row in Records::<PopulationRecord, _>::from_path(path)? {
      let (line, record) = row?;
      step.read += 1;

      let parsed = record
        .commune_code()
        .and_then(|code| record.population().map(|pop| (code, pop)));
      let (code, population) = match parsed {
        Ok((_, None)) => {
          step.filtered += 1;
          continue;
        }
        Ok((code, Some(population))) => (code, population),
        Err(e) => {
          step.skipped += 1;
          report.warn(path, line, e.to_string());
          continue;
        }
      };
      let Some(&com_id) = communes.get(&code) else {
        step.skipped += 1;
        report.warn(path, line, format!("unknown commune {code}"));
        continue;
      };
      step.record(update.execute(params![population, com_id])?);
    }
  }
  commit_step(tx, &["commune"], step, report)
}

// ─── Statistics ──────────────────────────────────────────────────────────────

fn load_statistic_types(conn: &Connection, report: &mut ImportReport) -> Result<()> {
  let mut step = StepReport::new(Step::StatisticTypes);
  let tx = conn.unchecked_transaction()?;
  {
    let mut insert = tx.prepare_cached(
      "INSERT INTO type_statistique (nom, description) VALUES (?1, ?2)
       ON CONFLICT (nom) DO NOTHING",
    )?;
    for def in CATALOG {
      step.read += 1;
      step.record(insert.execute(params![def.code, def.description])?);
    }
  }
  commit_step(tx, &["type_statistique"], step, report)
}

/// A NULL year never conflicts under `UNIQUE`, so duplicates are excluded
/// with `IS` instead of relying on the constraint.
const INSERT_STATISTIC: &str = "
INSERT INTO statistique (com_id, type_id, annee, annee_fin, valeur)
SELECT ?1, ?2, ?3, ?4, ?5
WHERE NOT EXISTS (
    SELECT 1 FROM statistique
    WHERE com_id = ?1 AND type_id = ?2 AND annee IS ?3
)";

fn load_statistics(
  conn: &Connection,
  path: &Path,
  communes: &HashMap<String, i64>,
  report: &mut ImportReport,
) -> Result<()> {
  let mut step = StepReport::new(Step::Statistics);

  let reader = StatisticsReader::from_path(path)?;
  let located: Vec<_> = reader.columns().map(|def| def.code).collect();
  debug!(columns = ?located, "statistic columns located");
  for code in reader.missing_columns() {
    report.warn(path, 1, format!("column {code} not found, ignored"));
  }

  let type_ids: HashMap<String, i64> = {
    let mut stmt = conn.prepare("SELECT nom, id FROM type_statistique")?;
    let map = stmt
      .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
      .collect::<rusqlite::Result<_>>()?;
    map
  };

  let tx = conn.unchecked_transaction()?;
  {
    let mut insert = tx.prepare_cached(INSERT_STATISTIC)?;
    let mut rows = 0u64;

    for row in reader {
      let row = row?;
      rows += 1;
      if rows % PROGRESS_EVERY == 0 {
        debug!(rows, inserted = step.inserted, "statistics progress");
      }
      step.read += row.cells.len() as u64;

      let code = match row.commune_code() {
        Ok(code) => code,
        Err(e) => {
          step.skipped += row.cells.len() as u64;
          report.warn(path, row.line, e.to_string());
          continue;
        }
      };
      let Some(&com_id) = communes.get(&code) else {
        step.skipped += row.cells.len() as u64;
        report.warn(path, row.line, format!("unknown commune {code}"));
        continue;
      };

      for cell in &row.cells {
        let value = match parse_value(&cell.raw) {
          Ok(Some(v)) => v,
          Ok(None) => {
            step.filtered += 1;
            continue;
          }
          Err(_) => {
            step.skipped += 1;
            report.warn(
              path,
              row.line,
              format!("invalid value for {code} {}: {:?}", cell.def.code, cell.raw),
            );
            continue;
          }
        };
        let Some(&type_id) = type_ids.get(cell.def.code) else {
          step.skipped += 1;
          report.warn(path, row.line, format!("statistic type {} not found", cell.def.code));
          continue;
        };

        let (year, end_year) = (cell.def.year, cell.def.end_year);
        step.record(insert.execute(params![com_id, type_id, year, end_year, value])?);
      }
    }
  }
  commit_step(tx, &["statistique"], step, report)
}
