//! Typed rows of the COG reference files and a streaming reader over them.

use std::{fs::File, io, marker::PhantomData, path::Path};

use csv::{ReaderBuilder, StringRecord, Trim};
use insee_core::{
  geo::{
    normalize_commune_code, normalize_departement_code, normalize_region_code,
    ChefLieu, Commune, CommuneKind, Departement, Region,
  },
  statistic::parse_value,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{Error, Result, COG_DELIMITER};

// ─── Record types ────────────────────────────────────────────────────────────

/// A row type of one of the reference files.
pub trait ReferenceRecord: DeserializeOwned {
  /// Columns are matched by position instead of by header name.
  const POSITIONAL: bool = false;
}

/// A row of `v_region_<year>.csv`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct RegionRecord {
  pub reg:      String,
  pub cheflieu: String,
  #[serde(default)]
  pub tncc:     Option<String>,
  #[serde(default)]
  pub ncc:      Option<String>,
  #[serde(default)]
  pub nccenr:   Option<String>,
  pub libelle:  String,
}

impl ReferenceRecord for RegionRecord {}

impl RegionRecord {
  pub fn region(&self) -> insee_core::Result<Region> {
    Ok(Region {
      code: normalize_region_code(&self.reg)?,
      name: self.libelle.trim().to_owned(),
    })
  }

  pub fn chef_lieu(&self) -> insee_core::Result<ChefLieu> {
    Ok(ChefLieu::Region {
      region_code:  normalize_region_code(&self.reg)?,
      commune_code: normalize_commune_code(&self.cheflieu)?,
    })
  }
}

/// A row of `v_departement_<year>.csv`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct DepartementRecord {
  pub dep:      String,
  pub reg:      String,
  pub cheflieu: String,
  #[serde(default)]
  pub tncc:     Option<String>,
  #[serde(default)]
  pub ncc:      Option<String>,
  #[serde(default)]
  pub nccenr:   Option<String>,
  pub libelle:  String,
}

impl ReferenceRecord for DepartementRecord {}

impl DepartementRecord {
  pub fn departement(&self) -> insee_core::Result<Departement> {
    Ok(Departement {
      code:        normalize_departement_code(&self.dep)?,
      name:        self.libelle.trim().to_owned(),
      region_code: normalize_region_code(&self.reg)?,
    })
  }

  pub fn chef_lieu(&self) -> insee_core::Result<ChefLieu> {
    Ok(ChefLieu::Departement {
      departement_code: normalize_departement_code(&self.dep)?,
      commune_code:     normalize_commune_code(&self.cheflieu)?,
    })
  }
}

/// A row of `v_commune_<year>.csv`.
///
/// Associated and delegated communes and municipal arrondissements share the
/// file with full communes; their `REG`/`DEP` cells are empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct CommuneRecord {
  pub typecom: String,
  pub com:     String,
  #[serde(default)]
  pub reg:     Option<String>,
  #[serde(default)]
  pub dep:     Option<String>,
  #[serde(default)]
  pub ncc:     Option<String>,
  pub libelle: String,
}

impl ReferenceRecord for CommuneRecord {}

impl CommuneRecord {
  pub fn kind(&self) -> insee_core::Result<CommuneKind> { CommuneKind::parse(&self.typecom) }

  pub fn commune(&self) -> insee_core::Result<Commune> {
    let dep = self.dep.as_deref().unwrap_or_default();
    Ok(Commune {
      code:             normalize_commune_code(&self.com)?,
      name:             self.libelle.trim().to_owned(),
      departement_code: normalize_departement_code(dep)?,
    })
  }
}

/// A row of the commune population file: commune code, then population.
/// Header names vary between extracts, so columns are taken by position.
#[derive(Debug, Clone, Deserialize)]
pub struct PopulationRecord {
  pub code:       String,
  pub population: String,
}

impl ReferenceRecord for PopulationRecord {
  const POSITIONAL: bool = true;
}

impl PopulationRecord {
  pub fn commune_code(&self) -> insee_core::Result<String> { normalize_commune_code(&self.code) }

  /// `Ok(None)` when the cell is empty.
  pub fn population(&self) -> insee_core::Result<Option<i64>> {
    match parse_value(&self.population)? {
      Some(v) if v < 0.0 => Err(insee_core::Error::InvalidNumber(self.population.clone())),
      Some(v) => Ok(Some(v.round() as i64)),
      None => Ok(None),
    }
  }
}

// ─── Reader ──────────────────────────────────────────────────────────────────

/// Streams typed records out of a reference file, paired with their line
/// number for diagnostics.
///
/// A row that does not fit the record type is yielded as an error; the
/// caller decides whether that aborts the file.
pub struct Records<T, R> {
  reader:  csv::Reader<R>,
  headers: Option<StringRecord>,
  record:  StringRecord,
  _marker: PhantomData<fn() -> T>,
}

impl<T: ReferenceRecord> Records<T, File> {
  /// Open a comma-separated reference file.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let reader = builder()
      .from_path(path)
      .map_err(|source| Error::Open { path: path.to_path_buf(), source })?;
    Self::from_csv(reader)
  }
}

impl<T: ReferenceRecord, R: io::Read> Records<T, R> {
  pub fn new(input: R) -> Result<Self> { Self::from_csv(builder().from_reader(input)) }

  fn from_csv(mut reader: csv::Reader<R>) -> Result<Self> {
    let headers = reader.headers()?.clone();
    Ok(Self {
      reader,
      headers: (!T::POSITIONAL).then_some(headers),
      record: StringRecord::new(),
      _marker: PhantomData,
    })
  }
}

fn builder() -> ReaderBuilder {
  let mut builder = ReaderBuilder::new();
  builder.delimiter(COG_DELIMITER).flexible(true).trim(Trim::All);
  builder
}

impl<T: ReferenceRecord, R: io::Read> Iterator for Records<T, R> {
  type Item = Result<(u64, T)>;

  fn next(&mut self) -> Option<Self::Item> {
    match self.reader.read_record(&mut self.record) {
      Ok(false) => None,
      Err(e) => Some(Err(e.into())),
      Ok(true) => {
        let line = self.record.position().map_or(0, |p| p.line());
        Some(
          self
            .record
            .deserialize::<T>(self.headers.as_ref())
            .map(|t| (line, t))
            .map_err(Error::from),
        )
      }
    }
  }
}
