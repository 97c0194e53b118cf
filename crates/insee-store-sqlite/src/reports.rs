//! [`ReportStore`] implementation: read-only queries over the populated
//! database.

use insee_core::{
  geo::{normalize_departement_code, normalize_region_code},
  report::{
    CommuneEvolution, CommunePopulation, DatabaseSummary, DepartementDensity,
    DepartementSummary, IntegrityViolation, RankedCommune, RegionExtremes,
    RegionGrowth, RegionPopulation, RegionSeat, TableCounts,
  },
  statistic::{population_code, SURFACE_CODE},
  store::ReportStore,
};
use rusqlite::{params, Connection};

use crate::{Error, Result, SqliteStore};

fn count(conn: &Connection, table: &str) -> rusqlite::Result<u64> {
  let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
  Ok(n as u64)
}

impl ReportStore for SqliteStore {
  type Error = Error;

  async fn departments_in_region(&self, region: &str) -> Result<Vec<DepartementSummary>> {
    let code = normalize_region_code(region).ok();
    let name = region.trim().to_lowercase();

    let rows = self
      .conn
      .call(move |conn| {
        // SQLite's NOCASE folds ASCII only; compare names in Rust so
        // "île-de-france" finds "Île-de-France".
        let regions = conn
          .prepare("SELECT reg_id, name FROM region")?
          .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let Some((reg_id, _)) = regions
          .into_iter()
          .find(|(id, n)| code.as_deref() == Some(id.as_str()) || n.to_lowercase() == name)
        else {
          return Ok(Vec::new());
        };

        let mut stmt = conn.prepare(
          "SELECT d.dep_id, d.name, c.name
           FROM departement d
           LEFT JOIN chef_lieu_departement cld ON cld.dep_id = d.dep_id
           LEFT JOIN commune c ON c.com_id = cld.com_id
           WHERE d.reg_id = ?1
           ORDER BY d.name",
        )?;
        let rows = stmt
          .query_map(params![reg_id], |row| {
            Ok(DepartementSummary {
              code:      row.get(0)?,
              name:      row.get(1)?,
              chef_lieu: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn communes_above_population(
    &self,
    departement: &str,
    min_population: f64,
  ) -> Result<Vec<CommunePopulation>> {
    let dep = normalize_departement_code(departement)?;

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT code_insee, name, population
           FROM commune_population
           WHERE dep_id = ?1 AND population > ?2
           ORDER BY population DESC, name",
        )?;
        let rows = stmt
          .query_map(params![dep, min_population], |row| {
            Ok(CommunePopulation {
              code:       row.get(0)?,
              name:       row.get(1)?,
              population: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn population_growth(&self, start_year: i32, end_year: i32) -> Result<Vec<RegionGrowth>> {
    population_code(start_year)?;
    population_code(end_year)?;

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT ps.nom_region, ps.population, pe.population,
                  ROUND((pe.population - ps.population) * 100.0
                        / NULLIF(ps.population, 0), 2) AS growth_rate
           FROM population_regions ps
           JOIN population_regions pe ON pe.reg_id = ps.reg_id
           WHERE ps.annee = ?1 AND pe.annee = ?2
           ORDER BY growth_rate DESC, ps.nom_region",
        )?;
        let rows = stmt
          .query_map(params![start_year, end_year], |row| {
            Ok(RegionGrowth {
              region:      row.get(0)?,
              pop_start:   row.get(1)?,
              pop_end:     row.get(2)?,
              growth_rate: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn region_extremes(&self) -> Result<RegionExtremes> {
    let mut regions: Vec<RegionPopulation> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT r.reg_id, r.name, SUM(cp.population) AS population
           FROM region r
           JOIN departement d         ON d.reg_id = r.reg_id
           JOIN commune_population cp ON cp.dep_id = d.dep_id
           GROUP BY r.reg_id, r.name
           HAVING population IS NOT NULL
           ORDER BY population DESC, r.reg_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RegionPopulation {
              code:       row.get(0)?,
              name:       row.get(1)?,
              population: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let least = regions.pop();
    let most = if regions.is_empty() { least.clone() } else { Some(regions.swap_remove(0)) };
    Ok(RegionExtremes { most, least })
  }

  async fn top_communes(&self, year: i32, limit: usize) -> Result<Vec<RankedCommune>> {
    let code = population_code(year)?;
    let limit = limit as i64;

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.name, d.name, s.valeur
           FROM commune c
           JOIN departement d      ON d.dep_id = c.dep_id
           JOIN statistique s      ON s.com_id = c.com_id
           JOIN type_statistique t ON t.id = s.type_id
           WHERE t.nom = ?1
           ORDER BY s.valeur DESC, c.name
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(params![code, limit], |row| {
            Ok(RankedCommune {
              commune:     row.get(0)?,
              departement: row.get(1)?,
              population:  row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn population_by_region(&self, year: i32) -> Result<Vec<RegionPopulation>> {
    population_code(year)?;

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT reg_id, nom_region, population
           FROM population_regions
           WHERE annee = ?1
           ORDER BY population DESC, reg_id",
        )?;
        let rows = stmt
          .query_map(params![year], |row| {
            Ok(RegionPopulation {
              code:       row.get(0)?,
              name:       row.get(1)?,
              population: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn commune_evolution(
    &self,
    start_year: i32,
    end_year: i32,
    limit: usize,
  ) -> Result<Vec<CommuneEvolution>> {
    let start = population_code(start_year)?;
    let end = population_code(end_year)?;
    let limit = limit as i64;

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.name, d.name, ps.valeur, pe.valeur,
                  ROUND((pe.valeur - ps.valeur) * 100.0 / ps.valeur, 2) AS evolution
           FROM commune c
           JOIN departement d  ON d.dep_id = c.dep_id
           JOIN statistique ps ON ps.com_id = c.com_id
                              AND ps.type_id = (SELECT id FROM type_statistique WHERE nom = ?1)
           JOIN statistique pe ON pe.com_id = c.com_id
                              AND pe.type_id = (SELECT id FROM type_statistique WHERE nom = ?2)
           WHERE ps.valeur > 0
           ORDER BY evolution DESC, c.name
           LIMIT ?3",
        )?;
        let rows = stmt
          .query_map(params![start, end, limit], |row| {
            Ok(CommuneEvolution {
              commune:     row.get(0)?,
              departement: row.get(1)?,
              pop_start:   row.get(2)?,
              pop_end:     row.get(3)?,
              evolution:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn departement_density(&self, limit: usize) -> Result<Vec<DepartementDensity>> {
    let limit = limit as i64;

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT d.name,
                  ROUND(SUM(cp.population) * 1.0 / NULLIF(SUM(s.valeur), 0), 2) AS density
           FROM departement d
           JOIN commune_population cp ON cp.dep_id = d.dep_id
           JOIN statistique s         ON s.com_id = cp.com_id
           JOIN type_statistique t    ON t.id = s.type_id
           WHERE t.nom = ?1 AND cp.population IS NOT NULL
           GROUP BY d.dep_id, d.name
           HAVING density IS NOT NULL
           ORDER BY density DESC, d.name
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(params![SURFACE_CODE, limit], |row| {
            Ok(DepartementDensity {
              departement: row.get(0)?,
              density:     row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  // ── Verification ──────────────────────────────────────────────────────────

  async fn summary(&self) -> Result<DatabaseSummary> {
    let summary = self
      .conn
      .call(|conn| {
        let counts = TableCounts {
          regions:                 count(conn, "region")?,
          departements:            count(conn, "departement")?,
          communes:                count(conn, "commune")?,
          chefs_lieux_region:      count(conn, "chef_lieu_region")?,
          chefs_lieux_departement: count(conn, "chef_lieu_departement")?,
          statistic_types:         count(conn, "type_statistique")?,
          statistics:              count(conn, "statistique")?,
        };

        let mut stmt = conn.prepare(
          "SELECT r.reg_id, r.name, c.name
           FROM region r
           JOIN chef_lieu_region clr ON clr.reg_id = r.reg_id
           JOIN commune c            ON c.com_id = clr.com_id
           ORDER BY r.reg_id
           LIMIT 5",
        )?;
        let sample_seats = stmt
          .query_map([], |row| {
            Ok(RegionSeat {
              region_code: row.get(0)?,
              region:      row.get(1)?,
              commune:     row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(DatabaseSummary { counts, sample_seats })
      })
      .await?;
    Ok(summary)
  }

  async fn integrity_check(&self) -> Result<Vec<IntegrityViolation>> {
    let violations = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
        let mut violations = stmt
          .query_map([], |row| {
            let parent: String = row.get(2)?;
            Ok(IntegrityViolation {
              table:  row.get(0)?,
              rowid:  row.get(1)?,
              reason: format!("missing {parent} reference"),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        // GROUP BY treats NULL years as equal, unlike the UNIQUE constraint.
        let mut stmt = conn.prepare(
          "SELECT MIN(id), COUNT(*)
           FROM statistique
           GROUP BY com_id, type_id, annee
           HAVING COUNT(*) > 1",
        )?;
        let duplicates = stmt
          .query_map([], |row| {
            let copies: i64 = row.get(1)?;
            Ok(IntegrityViolation {
              table:  "statistique".to_owned(),
              rowid:  row.get(0)?,
              reason: format!("{copies} rows for the same (commune, type, year)"),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        violations.extend(duplicates);
        Ok(violations)
      })
      .await?;
    Ok(violations)
  }
}
