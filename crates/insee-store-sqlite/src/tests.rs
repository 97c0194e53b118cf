//! Integration tests for `SqliteStore` against an in-memory database.

use std::{fs, path::Path};

use insee_core::store::ReportStore;
use tempfile::TempDir;

use crate::{Error, ImportFiles, ImportReport, SqliteStore, Step};

// ─── Fixtures ────────────────────────────────────────────────────────────────

const REGIONS: &str = "\
REG,CHEFLIEU,TNCC,NCC,NCCENR,LIBELLE
01,97105,3,GUADELOUPE,Guadeloupe,Guadeloupe
84,69123,1,AUVERGNE RHONE ALPES,Auvergne-Rhône-Alpes,Auvergne-Rhône-Alpes
";

const DEPARTEMENTS: &str = "\
DEP,REG,CHEFLIEU,TNCC,NCC,NCCENR,LIBELLE
971,01,97105,3,GUADELOUPE,Guadeloupe,Guadeloupe
69,84,69123,2,RHONE,Rhône,Rhône
01,84,01053,5,AIN,Ain,Ain
";

const COMMUNES: &str = "\
TYPECOM,COM,REG,DEP,CTCD,ARR,TNCC,NCC,NCCENR,LIBELLE,CAN,COMPARENT
COM,97105,01,971,971,,0,BASSE TERRE,Basse-Terre,Basse-Terre,,
COM,01001,84,01,01D,,5,ABERGEMENT CLEMENCIAT,Abergement-Clémenciat,L'Abergement-Clémenciat,,
COM,01002,84,01,01D,,5,ABERGEMENT DE VAREY,Abergement-de-Varey,L'Abergement-de-Varey,,
COM,01004,84,01,01D,,1,AMBERIEU EN BUGEY,Ambérieu-en-Bugey,Ambérieu-en-Bugey,,
COM,01053,84,01,01D,,0,BOURG EN BRESSE,Bourg-en-Bresse,Bourg-en-Bresse,,
COM,69123,84,69,69D,,0,LYON,Lyon,Lyon,,
ARM,69381,84,69,69D,,0,LYON 1ER ARRONDISSEMENT,\
Lyon 1er Arrondissement,Lyon 1er Arrondissement,,69123
";

// 97105 grows from 1000 to 1100 (10 %); 01053 sits exactly on 10000.
const STATISTICS: &str = "\
CODGEO;P21_POP;P15_POP;SUPERF;NAIS1520
97105;1100;1000;5.78;70
1001;832;767;15.95;s
01004;15000;14000;24.6;900
01053;10000;9000;23.86;2500
69123;522000;513000;47.87;40000
99999;100;100;1;1
";

const POPULATION: &str = "\
codgeo,population
01002,240
99999,5
01001,abc
";

struct Fixture {
  dir: TempDir,
}

impl Fixture {
  fn new() -> Self {
    let fixture = Self { dir: tempfile::tempdir().expect("temp dir") };
    fixture.write("regions.csv", REGIONS);
    fixture.write("departements.csv", DEPARTEMENTS);
    fixture.write("communes.csv", COMMUNES);
    fixture.write("statistics.csv", STATISTICS);
    fixture.write("population.csv", POPULATION);
    fixture
  }

  fn write(&self, name: &str, content: &str) {
    fs::write(self.dir.path().join(name), content).expect("write fixture");
  }

  fn path(&self) -> &Path { self.dir.path() }

  fn files(&self) -> ImportFiles {
    ImportFiles {
      regions:      self.path().join("regions.csv"),
      departements: self.path().join("departements.csv"),
      communes:     self.path().join("communes.csv"),
      population:   Some(self.path().join("population.csv")),
      statistics:   self.path().join("statistics.csv"),
    }
  }
}

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn imported() -> (SqliteStore, ImportReport) {
  let fixture = Fixture::new();
  let s = store().await;
  let report = s.import(fixture.files()).await.unwrap();
  (s, report)
}

/// Run raw SQL on the store's connection, returning the error text if any.
async fn exec(s: &SqliteStore, sql: &'static str) -> Result<(), String> {
  s.conn
    .call(move |conn| Ok(conn.execute_batch(sql).map_err(|e| e.to_string())))
    .await
    .unwrap()
}

async fn scalar(s: &SqliteStore, sql: &'static str) -> i64 {
  s.conn
    .call(move |conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
    .await
    .unwrap()
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_init_is_idempotent() {
  let s = store().await;
  s.init_schema().await.unwrap();
  s.init_schema().await.unwrap();
  let summary = s.summary().await.unwrap();
  assert_eq!(summary.counts.regions, 0);
}

#[tokio::test]
async fn reference_tables_are_read_only_outside_an_import() {
  let (s, _) = imported().await;

  let err = exec(&s, "UPDATE region SET name = 'x'").await.unwrap_err();
  assert!(err.contains("read-only"), "{err}");
  let err = exec(&s, "DELETE FROM departement").await.unwrap_err();
  assert!(err.contains("read-only"), "{err}");

  assert_eq!(scalar(&s, "PRAGMA foreign_keys").await, 1);
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn import_loads_every_table() {
  let (s, report) = imported().await;
  let counts = s.summary().await.unwrap().counts;

  assert_eq!(counts.regions, 2);
  assert_eq!(counts.departements, 3);
  assert_eq!(counts.communes, 6);
  assert_eq!(counts.chefs_lieux_region, 2);
  assert_eq!(counts.chefs_lieux_departement, 3);
  assert_eq!(counts.statistic_types, 31);

  let communes = report.step(Step::Communes).unwrap();
  assert_eq!(communes.read, 7);
  assert_eq!(communes.inserted, 6);
  assert_eq!(communes.filtered, 1);
}

#[tokio::test]
async fn statistics_skip_bad_rows_and_keep_going() {
  let (s, report) = imported().await;

  // 5 known communes × 4 columns, minus the "s" cell of 01001.
  assert_eq!(s.summary().await.unwrap().counts.statistics, 19);

  let stats = report.step(Step::Statistics).unwrap();
  assert_eq!(stats.inserted, 19);
  assert_eq!(stats.skipped, 1 + 4);

  let messages: Vec<_> = report.warnings.iter().map(|w| w.message.as_str()).collect();
  assert!(messages.iter().any(|m| m.contains("invalid value for 01001 NAIS1520")));
  assert!(messages.iter().any(|m| m.contains("unknown commune 99999")));

  let bad = report
    .warnings
    .iter()
    .find(|w| w.message.contains("NAIS1520"))
    .unwrap();
  assert_eq!(bad.file, "statistics.csv");
  assert_eq!(bad.line, 3);
}

#[tokio::test]
async fn non_numeric_value_does_not_abort_the_file() {
  let fixture = Fixture::new();
  fixture.write(
    "statistics.csv",
    "CODGEO;P21_POP\n01001;abc\n01004;\n01053;10000\n69123;522000\n",
  );
  let s = store().await;
  let report = s.import(fixture.files()).await.unwrap();

  let stats = report.step(Step::Statistics).unwrap();
  assert_eq!(stats.inserted, 2);
  assert_eq!(stats.skipped, 1);
  assert_eq!(stats.filtered, 1);
  assert_eq!(s.summary().await.unwrap().counts.statistics, 2);
}

#[tokio::test]
async fn population_file_fills_the_commune_column() {
  let (s, report) = imported().await;

  let pop = report.step(Step::Population).unwrap();
  assert_eq!(pop.read, 3);
  assert_eq!(pop.inserted, 1);
  assert_eq!(pop.skipped, 2);

  assert_eq!(
    scalar(&s, "SELECT population FROM commune WHERE code_insee = '01002'").await,
    240
  );
}

#[tokio::test]
async fn reimport_leaves_counts_unchanged() {
  let fixture = Fixture::new();
  let s = store().await;

  s.import(fixture.files()).await.unwrap();
  let first = s.summary().await.unwrap().counts;

  let again = s.import(fixture.files()).await.unwrap();
  let second = s.summary().await.unwrap().counts;

  assert_eq!(first, second);
  for step in &again.steps {
    assert_eq!(step.inserted, 0, "{:?} inserted rows on re-import", step.step);
  }
}

#[tokio::test]
async fn references_hold_after_import() {
  let (s, _) = imported().await;
  assert!(s.integrity_check().await.unwrap().is_empty());

  let orphans = scalar(
    &s,
    "SELECT COUNT(*) FROM commune c
     LEFT JOIN departement d ON d.dep_id = c.dep_id
     WHERE d.dep_id IS NULL",
  )
  .await;
  assert_eq!(orphans, 0);
}

#[tokio::test]
async fn statistics_are_unique_per_commune_type_and_year() {
  let fixture = Fixture::new();
  let s = store().await;
  s.import(fixture.files()).await.unwrap();
  s.import(fixture.files()).await.unwrap();

  // SUPERF has no year; NULL must not defeat uniqueness.
  let duplicates = scalar(
    &s,
    "SELECT COUNT(*) FROM (
       SELECT 1 FROM statistique
       GROUP BY com_id, type_id, annee
       HAVING COUNT(*) > 1
     )",
  )
  .await;
  assert_eq!(duplicates, 0);
}

#[tokio::test]
async fn periods_store_start_and_end_year() {
  let (s, _) = imported().await;
  let end = scalar(
    &s,
    "SELECT s.annee_fin FROM statistique s
     JOIN type_statistique t ON t.id = s.type_id
     JOIN commune c ON c.com_id = s.com_id
     WHERE t.nom = 'NAIS1520' AND c.code_insee = '01004'",
  )
  .await;
  assert_eq!(end, 2020);
}

#[tokio::test]
async fn missing_file_fails_before_loading() {
  let fixture = Fixture::new();
  let mut files = fixture.files();
  files.statistics = fixture.path().join("absent.csv");

  let s = store().await;
  let err = s.import(files).await.unwrap_err();
  assert!(matches!(err, Error::MissingFile(_)));
  assert_eq!(s.summary().await.unwrap().counts.regions, 0);
}

#[tokio::test]
async fn failed_step_rolls_back_and_restores_enforcement() {
  let fixture = Fixture::new();
  // The department file loses its LIBELLE column.
  fixture.write("departements.csv", "DEP,REG,CHEFLIEU\n01,84,01053\n");

  let s = store().await;
  assert!(s.import(fixture.files()).await.is_err());

  let counts = s.summary().await.unwrap().counts;
  assert_eq!(counts.regions, 2);
  assert_eq!(counts.departements, 0);

  assert_eq!(scalar(&s, "SELECT locked FROM import_lock").await, 1);
  assert_eq!(scalar(&s, "PRAGMA foreign_keys").await, 1);
}

#[tokio::test]
async fn dangling_region_reference_aborts_the_step() {
  let fixture = Fixture::new();
  fixture.write(
    "departements.csv",
    "DEP,REG,CHEFLIEU,TNCC,NCC,NCCENR,LIBELLE\n\
     01,84,01053,5,AIN,Ain,Ain\n\
     75,11,75056,0,PARIS,Paris,Paris\n",
  );

  let s = store().await;
  let err = s.import(fixture.files()).await.unwrap_err();
  assert!(matches!(err, Error::ForeignKeyViolation { table: "departement", count: 1 }));
  assert_eq!(s.summary().await.unwrap().counts.departements, 0);
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn departments_of_region_by_code() {
  let (s, _) = imported().await;

  let deps = s.departments_in_region("01").await.unwrap();
  assert_eq!(deps.len(), 1);
  assert_eq!(deps[0].code, "971");
  assert_eq!(deps[0].name, "Guadeloupe");
  assert_eq!(deps[0].chef_lieu.as_deref(), Some("Basse-Terre"));
}

#[tokio::test]
async fn departments_of_region_by_name_sorted() {
  let (s, _) = imported().await;

  let deps = s.departments_in_region("auvergne-rhône-alpes").await.unwrap();
  let names: Vec<_> = deps.iter().map(|d| d.name.as_str()).collect();
  assert_eq!(names, ["Ain", "Rhône"]);
}

#[tokio::test]
async fn region_name_matching_folds_accented_capitals() {
  let fixture = Fixture::new();
  fixture.write(
    "regions.csv",
    &format!("{REGIONS}11,75056,1,ILE DE FRANCE,Île-de-France,Île-de-France\n"),
  );
  fixture.write(
    "departements.csv",
    &format!("{DEPARTEMENTS}75,11,75056,0,PARIS,Paris,Paris\n"),
  );
  fixture.write(
    "communes.csv",
    &format!("{COMMUNES}COM,75056,11,75,75C,,0,PARIS,Paris,Paris,,\n"),
  );
  let s = store().await;
  s.import(fixture.files()).await.unwrap();

  for spelling in ["Île-de-France", "île-de-france", "ÎLE-DE-FRANCE", "11"] {
    let deps = s.departments_in_region(spelling).await.unwrap();
    assert_eq!(deps.len(), 1, "{spelling}");
    assert_eq!(deps[0].code, "75");
    assert_eq!(deps[0].chef_lieu.as_deref(), Some("Paris"));
  }
  assert!(s.departments_in_region("ile-de-france").await.unwrap().is_empty());
}

#[tokio::test]
async fn communes_strictly_above_threshold() {
  let (s, _) = imported().await;

  let communes = s.communes_above_population("01", 10_000.0).await.unwrap();
  let codes: Vec<_> = communes.iter().map(|c| c.code.as_str()).collect();
  assert_eq!(codes, ["01004"]);
  assert_eq!(communes[0].population, 15_000.0);
}

#[tokio::test]
async fn stored_population_is_the_fallback() {
  let (s, _) = imported().await;

  // 01002 has no census statistic, only the population file value.
  let communes = s.communes_above_population("1", 200.0).await.unwrap();
  let codes: Vec<_> = communes.iter().map(|c| c.code.as_str()).collect();
  assert_eq!(codes, ["01004", "01053", "01001", "01002"]);
}

#[tokio::test]
async fn growth_rate_between_censuses() {
  let (s, _) = imported().await;

  let growth = s.population_growth(2015, 2021).await.unwrap();
  let guadeloupe = growth.iter().find(|g| g.region == "Guadeloupe").unwrap();
  assert_eq!(guadeloupe.pop_start, 1000.0);
  assert_eq!(guadeloupe.pop_end, 1100.0);
  assert_eq!(guadeloupe.growth_rate, Some(10.0));
}

#[tokio::test]
async fn growth_rejects_unknown_census_year() {
  let (s, _) = imported().await;
  let err = s.population_growth(2016, 2021).await.unwrap_err();
  assert!(matches!(err, Error::Core(insee_core::Error::UnknownCensusYear(2016))));
}

#[tokio::test]
async fn most_and_least_populated_regions() {
  let (s, _) = imported().await;

  let extremes = s.region_extremes().await.unwrap();
  assert_eq!(extremes.most.unwrap().code, "84");
  assert_eq!(extremes.least.unwrap().code, "01");
}

#[tokio::test]
async fn top_communes_and_regional_totals() {
  let (s, _) = imported().await;

  let top = s.top_communes(2021, 2).await.unwrap();
  assert_eq!(top.len(), 2);
  assert_eq!(top[0].commune, "Lyon");
  assert_eq!(top[0].departement, "Rhône");
  assert_eq!(top[1].commune, "Ambérieu-en-Bugey");

  let regions = s.population_by_region(2021).await.unwrap();
  assert_eq!(regions[0].code, "84");
  assert_eq!(regions[0].population, 522_000.0 + 15_000.0 + 10_000.0 + 832.0);
  assert_eq!(regions[1].population, 1100.0);
}

#[tokio::test]
async fn commune_evolution_ranks_by_percent() {
  let (s, _) = imported().await;

  let evolution = s.commune_evolution(2015, 2021, 10).await.unwrap();
  assert_eq!(evolution[0].commune, "Bourg-en-Bresse");
  assert_eq!(evolution[0].evolution, 11.11);
  assert_eq!(evolution[1].commune, "Basse-Terre");
  assert_eq!(evolution[1].evolution, 10.0);
  assert_eq!(evolution.len(), 5);
}

#[tokio::test]
async fn density_divides_population_by_surface() {
  let (s, _) = imported().await;

  let density = s.departement_density(5).await.unwrap();
  let rhone = density.iter().find(|d| d.departement == "Rhône").unwrap();
  assert!((rhone.density - 522_000.0 / 47.87).abs() < 0.01);
  assert_eq!(density[0].departement, "Rhône");
}

#[tokio::test]
async fn summary_samples_region_seats() {
  let (s, _) = imported().await;

  let seats = s.summary().await.unwrap().sample_seats;
  assert_eq!(seats.len(), 2);
  assert_eq!(seats[0].region_code, "01");
  assert_eq!(seats[0].commune, "Basse-Terre");
  assert_eq!(seats[1].commune, "Lyon");
}
