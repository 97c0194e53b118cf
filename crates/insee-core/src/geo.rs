//! The administrative hierarchy: region → department → commune.
//!
//! Codes are kept as text. INSEE codes are zero-padded and some department
//! codes are alphanumeric (`2A`, `2B` for Corsica), so they are never numbers.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
  pub code: String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departement {
  pub code:        String,
  pub name:        String,
  pub region_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commune {
  /// The five-character INSEE code.
  pub code:             String,
  pub name:             String,
  pub departement_code: String,
}

/// Designates the seat commune of a region or a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum ChefLieu {
  Region { region_code: String, commune_code: String },
  Departement { departement_code: String, commune_code: String },
}

impl ChefLieu {
  pub fn commune_code(&self) -> &str {
    match self {
      Self::Region { commune_code, .. } | Self::Departement { commune_code, .. } => {
        commune_code
      }
    }
  }
}

/// The `TYPECOM` column of the commune file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommuneKind {
  /// A full commune; the only kind loaded into the database.
  Commune,
  Associee,
  Deleguee,
  /// A municipal arrondissement of Paris, Lyon or Marseille.
  Arrondissement,
}

impl CommuneKind {
  pub fn parse(s: &str) -> Result<Self> {
    match s.trim() {
      "COM" => Ok(Self::Commune),
      "COMA" => Ok(Self::Associee),
      "COMD" => Ok(Self::Deleguee),
      "ARM" => Ok(Self::Arrondissement),
      other => Err(Error::UnknownCommuneKind(other.to_owned())),
    }
  }
}

// ─── Code normalisation ──────────────────────────────────────────────────────

fn zero_pad(s: &str, width: usize) -> String { format!("{s:0>width$}") }

fn all_digits(s: &str) -> bool { !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) }

/// Normalise a region code to its two-digit form (`"1"` → `"01"`).
pub fn normalize_region_code(raw: &str) -> Result<String> {
  let s = raw.trim();
  if all_digits(s) && s.len() <= 2 {
    Ok(zero_pad(s, 2))
  } else {
    Err(Error::InvalidRegionCode(raw.to_owned()))
  }
}

/// Normalise a department code: metropolitan codes are two characters
/// (`"01"`, `"2A"`), overseas codes three digits (`"971"`).
pub fn normalize_departement_code(raw: &str) -> Result<String> {
  let s = raw.trim().to_ascii_uppercase();
  match s.len() {
    1 | 2 if all_digits(&s) => Ok(zero_pad(&s, 2)),
    2 if s == "2A" || s == "2B" => Ok(s),
    3 if all_digits(&s) => Ok(s),
    _ => Err(Error::InvalidDepartementCode(raw.to_owned())),
  }
}

/// Normalise a commune code to five characters, zero-padding purely numeric
/// codes that lost their leading zeros (`"1004"` → `"01004"`).
pub fn normalize_commune_code(raw: &str) -> Result<String> {
  let s = raw.trim().to_ascii_uppercase();
  if all_digits(&s) && s.len() <= 5 {
    return Ok(zero_pad(&s, 5));
  }
  if s.len() == 5 && s.bytes().all(|b| b.is_ascii_alphanumeric()) {
    return Ok(s);
  }
  Err(Error::InvalidCommuneCode(raw.to_owned()))
}
