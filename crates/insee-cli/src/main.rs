//! `insee`: build and query the INSEE reference database.
//!
//! # Usage
//!
//! ```text
//! insee import
//! insee verify
//! insee report departments Occitanie
//! insee --format json report growth 2015 2021
//! ```
//!
//! Settings come from `insee.toml` (or `--config`), then `INSEE_*`
//! environment variables, then the flags below.

mod config;
mod render;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use insee_core::{statistic::LATEST_CENSUS, store::ReportStore};
use insee_store_sqlite::{ImportReport, SqliteStore};
use render::{Table, number};
use serde::Serialize;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "insee", version, about = "Load and query the INSEE reference database")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "insee.toml")]
  config: PathBuf,

  /// SQLite database file; overrides `database_path`.
  #[arg(long, global = true)]
  database: Option<PathBuf>,

  /// Directory holding the reference CSV files; overrides `data_dir`.
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[arg(long, global = true, value_enum, default_value_t = Format::Table)]
  format: Format,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
  Table,
  Json,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create the schema.
  Init,
  /// Load the reference files, then print the verification summary.
  Import,
  /// Print table counts and integrity violations; fails if any exist.
  Verify,
  /// Run a read-only report.
  Report {
    #[command(subcommand)]
    report: Report,
  },
}

#[derive(Subcommand, Debug, Clone)]
enum Report {
  /// Departments of a region, given by code or name.
  Departments { region: String },
  /// Communes of a department above a population threshold.
  Communes {
    departement:    String,
    #[arg(long, default_value_t = 10_000.0)]
    min_population: f64,
  },
  /// Population growth per region between two census years.
  Growth { start: i32, end: i32 },
  /// Most and least populated regions.
  Extremes,
  /// Most populated communes for a census year.
  Top {
    #[arg(long, default_value_t = LATEST_CENSUS)]
    year:  i32,
    #[arg(long, default_value_t = 5)]
    limit: usize,
  },
  /// Population per region for a census year.
  ByRegion {
    #[arg(long, default_value_t = LATEST_CENSUS)]
    year: i32,
  },
  /// Communes with the largest population change between two censuses.
  Evolution {
    #[arg(long, default_value_t = 2015)]
    start: i32,
    #[arg(long, default_value_t = LATEST_CENSUS)]
    end:   i32,
    #[arg(long, default_value_t = 5)]
    limit: usize,
  },
  /// Most densely populated departments.
  Density {
    #[arg(long, default_value_t = 5)]
    limit: usize,
  },
  /// Every report that needs no argument.
  All,
}

impl Report {
  fn defaults() -> [Report; 6] {
    [
      Report::Extremes,
      Report::Growth { start: 2015, end: LATEST_CENSUS },
      Report::Top { year: LATEST_CENSUS, limit: 5 },
      Report::ByRegion { year: LATEST_CENSUS },
      Report::Evolution { start: 2015, end: LATEST_CENSUS, limit: 5 },
      Report::Density { limit: 5 },
    ]
  }

  fn title(&self) -> String {
    match self {
      Report::Departments { region } => format!("Departements of {region}"),
      Report::Communes { departement, min_population } => {
        format!("Communes of {departement} above {} inhabitants", number(*min_population))
      }
      Report::Growth { start, end } => format!("Population growth {start}-{end} by region"),
      Report::Extremes => "Most and least populated regions".to_owned(),
      Report::Top { year, limit } => format!("Top {limit} communes by population ({year})"),
      Report::ByRegion { year } => format!("Population by region ({year})"),
      Report::Evolution { start, end, limit } => {
        format!("Top {limit} communes by population change {start}-{end}")
      }
      Report::Density { limit } => format!("Top {limit} departements by density (hab/km²)"),
      Report::All => "All reports".to_owned(),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so JSON output stays parseable.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)?;
  if let Some(database) = cli.database {
    settings.database_path = database;
  }
  if let Some(data_dir) = cli.data_dir {
    settings.data_dir = data_dir;
  }

  let db_path = settings.database_path();
  let store = SqliteStore::open(&db_path)
    .await
    .with_context(|| format!("failed to open database at {db_path:?}"))?;

  match cli.command {
    Command::Init => {
      info!(path = %db_path.display(), "schema ready");
      Ok(())
    }
    Command::Import => import(&store, &settings, cli.format).await,
    Command::Verify => verify(&store, cli.format).await,
    Command::Report { report } => show(&store, &report, cli.format).await,
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn import(store: &SqliteStore, settings: &Settings, format: Format) -> anyhow::Result<()> {
  let files = settings.import_files();
  info!(files = ?files, "starting import");

  let report = store.import(files).await.context("import failed")?;
  emit(format, "Import", &report, import_table)?;
  if !report.warnings.is_empty() {
    warn!(count = report.warnings.len(), "rows skipped during import");
  }

  verify(store, format).await
}

fn import_table(report: &ImportReport) -> Table {
  let mut table = Table::new(["Step", "Read", "Inserted", "Existing", "Skipped", "Filtered"]);
  for step in &report.steps {
    table.row([
      step.step.label().to_owned(),
      step.read.to_string(),
      step.inserted.to_string(),
      step.existing.to_string(),
      step.skipped.to_string(),
      step.filtered.to_string(),
    ]);
  }
  table
}

async fn verify(store: &SqliteStore, format: Format) -> anyhow::Result<()> {
  let summary = store.summary().await.context("failed to count rows")?;
  emit(format, "Imported rows", &summary, |summary| {
    let c = &summary.counts;
    let mut table = Table::new(["Table", "Rows"]);
    table
      .row(["region".to_owned(), c.regions.to_string()])
      .row(["departement".to_owned(), c.departements.to_string()])
      .row(["commune".to_owned(), c.communes.to_string()])
      .row(["chef_lieu_region".to_owned(), c.chefs_lieux_region.to_string()])
      .row(["chef_lieu_departement".to_owned(), c.chefs_lieux_departement.to_string()])
      .row(["type_statistique".to_owned(), c.statistic_types.to_string()])
      .row(["statistique".to_owned(), c.statistics.to_string()]);
    table
  })?;
  // JSON output already carries the seats inside the summary.
  if format == Format::Table && !summary.sample_seats.is_empty() {
    let mut seats = Table::new(["Code", "Region", "Chef-lieu"]);
    for seat in &summary.sample_seats {
      seats.row([seat.region_code.clone(), seat.region.clone(), seat.commune.clone()]);
    }
    println!("\n=== Sample region chefs-lieux ===");
    println!("{seats}");
  }

  let violations = store.integrity_check().await.context("integrity check failed")?;
  if violations.is_empty() {
    info!("no integrity violations");
    return Ok(());
  }
  emit(format, "Integrity violations", &violations, |violations| {
    let mut table = Table::new(["Table", "Row", "Problem"]);
    for v in violations {
      table.row([
        v.table.clone(),
        v.rowid.map(|id| id.to_string()).unwrap_or_default(),
        v.reason.clone(),
      ]);
    }
    table
  })?;
  anyhow::bail!("{} integrity violation(s)", violations.len())
}

/// Run one report, or every default report for [`Report::All`].
async fn show(store: &SqliteStore, report: &Report, format: Format) -> anyhow::Result<()> {
  match report {
    Report::All => {
      let outcome = show_each(store, &Report::defaults(), format).await;
      info!(ran = outcome.ran.len(), skipped = outcome.skipped.len(), "reports done");
      Ok(())
    }
    report => show_one(store, report, format).await,
  }
}

/// Titles of the reports that ran, and of those skipped after an error.
#[derive(Debug, Default)]
struct Outcome {
  ran:     Vec<String>,
  skipped: Vec<String>,
}

/// Run `reports` in order. A failing report is logged and skipped; the
/// next one still runs.
async fn show_each(store: &SqliteStore, reports: &[Report], format: Format) -> Outcome {
  let mut outcome = Outcome::default();
  for report in reports {
    let title = report.title();
    match show_one(store, report, format).await {
      Ok(()) => outcome.ran.push(title),
      Err(e) => {
        error!(report = %title, "report skipped: {e:#}");
        outcome.skipped.push(title);
      }
    }
  }
  outcome
}

async fn show_one(store: &SqliteStore, report: &Report, format: Format) -> anyhow::Result<()> {
  let title = report.title();
  match report {
    Report::Departments { region } => {
      let rows = store.departments_in_region(region).await?;
      emit(format, &title, &rows, |rows| {
        let mut table = Table::new(["Code", "Departement", "Chef-lieu"]);
        for d in rows {
          table.row([d.code.clone(), d.name.clone(), d.chef_lieu.clone().unwrap_or_default()]);
        }
        table
      })
    }
    Report::Communes { departement, min_population } => {
      let rows = store.communes_above_population(departement, *min_population).await?;
      emit(format, &title, &rows, |rows| {
        let mut table = Table::new(["Code", "Commune", "Population"]);
        for c in rows {
          table.row([c.code.clone(), c.name.clone(), number(c.population)]);
        }
        table
      })
    }
    Report::Growth { start, end } => {
      let rows = store.population_growth(*start, *end).await?;
      emit(format, &title, &rows, |rows| {
        let mut table = Table::new([
          "Region".to_owned(),
          format!("Pop {start}"),
          format!("Pop {end}"),
          "Rate (%)".to_owned(),
        ]);
        for g in rows {
          table.row([
            g.region.clone(),
            number(g.pop_start),
            number(g.pop_end),
            g.growth_rate.map(number).unwrap_or_default(),
          ]);
        }
        table
      })
    }
    Report::Extremes => {
      let extremes = store.region_extremes().await?;
      emit(format, &title, &extremes, |extremes| {
        let mut table = Table::new(["", "Region", "Population"]);
        for (label, region) in [("most", &extremes.most), ("least", &extremes.least)] {
          if let Some(r) = region {
            table.row([label.to_owned(), r.name.clone(), number(r.population)]);
          }
        }
        table
      })
    }
    Report::Top { year, limit } => {
      let rows = store.top_communes(*year, *limit).await?;
      emit(format, &title, &rows, |rows| {
        let mut table = Table::new(["Commune", "Departement", "Population"]);
        for c in rows {
          table.row([c.commune.clone(), c.departement.clone(), number(c.population)]);
        }
        table
      })
    }
    Report::ByRegion { year } => {
      let rows = store.population_by_region(*year).await?;
      emit(format, &title, &rows, |rows| {
        let mut table = Table::new(["Code", "Region", "Population"]);
        for r in rows {
          table.row([r.code.clone(), r.name.clone(), number(r.population)]);
        }
        table
      })
    }
    Report::Evolution { start, end, limit } => {
      let rows = store.commune_evolution(*start, *end, *limit).await?;
      emit(format, &title, &rows, |rows| {
        let mut table = Table::new([
          "Commune".to_owned(),
          "Departement".to_owned(),
          format!("Pop {start}"),
          format!("Pop {end}"),
          "Change (%)".to_owned(),
        ]);
        for c in rows {
          table.row([
            c.commune.clone(),
            c.departement.clone(),
            number(c.pop_start),
            number(c.pop_end),
            number(c.evolution),
          ]);
        }
        table
      })
    }
    Report::Density { limit } => {
      let rows = store.departement_density(*limit).await?;
      emit(format, &title, &rows, |rows| {
        let mut table = Table::new(["Departement", "Density (hab/km²)"]);
        for d in rows {
          table.row([d.departement.clone(), number(d.density)]);
        }
        table
      })
    }
    Report::All => anyhow::bail!("`all` expands to several reports"),
  }
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn emit<T: Serialize>(
  format: Format,
  title: &str,
  value: &T,
  table: impl FnOnce(&T) -> Table,
) -> anyhow::Result<()> {
  match format {
    Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
    Format::Table => {
      println!("\n=== {title} ===");
      println!("{}", table(value));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_definition_is_valid() {
    Cli::command().debug_assert();
  }

  #[test]
  fn communes_threshold_defaults_to_ten_thousand() {
    let cli = Cli::try_parse_from(["insee", "report", "communes", "01"]).unwrap();
    let Command::Report { report: Report::Communes { departement, min_population } } = cli.command
    else {
      panic!("expected communes report");
    };
    assert_eq!(departement, "01");
    assert_eq!(min_population, 10_000.0);
  }

  #[test]
  fn global_flags_follow_the_subcommand() {
    let args = ["insee", "report", "top", "--limit", "3", "--format", "json", "--database", "x.db"];
    let cli = Cli::try_parse_from(args).unwrap();
    assert_eq!(cli.format, Format::Json);
    assert_eq!(cli.database, Some(PathBuf::from("x.db")));
    assert!(matches!(
      cli.command,
      Command::Report { report: Report::Top { year: LATEST_CENSUS, limit: 3 } }
    ));
  }

  #[test]
  fn all_reports_need_no_arguments() {
    let titles: Vec<_> = Report::defaults().iter().map(Report::title).collect();
    assert_eq!(titles.len(), 6);
    assert!(titles.iter().all(|t| !t.is_empty()));
  }

  #[tokio::test]
  async fn failing_report_is_skipped_and_the_rest_still_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("insee.db");
    let store = SqliteStore::open(&path).await.unwrap();

    // Break the two reports built on the regional population view.
    rusqlite::Connection::open(&path)
      .unwrap()
      .execute_batch("DROP VIEW population_regions")
      .unwrap();

    let reports = Report::defaults();
    let outcome = show_each(&store, &reports, Format::Json).await;

    let title = |i: usize| reports[i].title();
    assert_eq!(outcome.skipped, [title(1), title(3)]);
    assert_eq!(outcome.ran, [title(0), title(2), title(4), title(5)]);
  }

  #[tokio::test]
  async fn all_is_not_a_single_report() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    assert!(show_one(&store, &Report::All, Format::Json).await.is_err());
  }
}
