//! Runtime settings: an optional TOML file, overridden by `INSEE_*`
//! environment variables, overridden in turn by command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use insee_store_sqlite::ImportFiles;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_database_path")]
  pub database_path: PathBuf,
  /// Directory the names under `[files]` are resolved against.
  #[serde(default = "default_data_dir")]
  pub data_dir:      PathBuf,
  #[serde(default)]
  pub files:         FileNames,
}

/// Names of the reference files, relative to `data_dir` unless absolute.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileNames {
  pub regions:      PathBuf,
  pub departements: PathBuf,
  pub communes:     PathBuf,
  pub statistics:   PathBuf,
  pub population:   Option<PathBuf>,
}

impl Default for FileNames {
  fn default() -> Self {
    Self {
      regions:      "v_region_2024.csv".into(),
      departements: "v_departement_2024.csv".into(),
      communes:     "v_commune_2024.csv".into(),
      statistics:   "base-cc-serie-historique-2021.csv".into(),
      population:   None,
    }
  }
}

fn default_database_path() -> PathBuf { "insee.db".into() }

fn default_data_dir() -> PathBuf { "data".into() }

impl Settings {
  /// Read `path` if it exists, then layer the environment on top.
  /// `INSEE_FILES__REGIONS` sets `files.regions`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("INSEE")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn database_path(&self) -> PathBuf { expand_tilde(&self.database_path) }

  pub fn import_files(&self) -> ImportFiles {
    let dir = expand_tilde(&self.data_dir);
    // `join` keeps absolute names as they are.
    let resolve = |name: &Path| dir.join(expand_tilde(name));
    ImportFiles {
      regions:      resolve(&self.files.regions),
      departements: resolve(&self.files.departements),
      communes:     resolve(&self.files.communes),
      population:   self.files.population.as_deref().map(resolve),
      statistics:   resolve(&self.files.statistics),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn settings(toml: &str) -> Settings {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let s = settings("");
    assert_eq!(s.database_path, PathBuf::from("insee.db"));
    assert_eq!(s.data_dir, PathBuf::from("data"));
    assert_eq!(s.files.regions, PathBuf::from("v_region_2024.csv"));
    assert!(s.files.population.is_none());
  }

  #[test]
  fn files_resolve_against_data_dir() {
    let s = settings(
      r#"
      data_dir = "/srv/insee"

      [files]
      communes   = "/tmp/communes.csv"
      population = "pop.csv"
      "#,
    );
    let files = s.import_files();
    assert_eq!(files.regions, PathBuf::from("/srv/insee/v_region_2024.csv"));
    assert_eq!(files.communes, PathBuf::from("/tmp/communes.csv"));
    assert_eq!(files.population, Some(PathBuf::from("/srv/insee/pop.csv")));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/insee.db")), PathBuf::from(home).join("insee.db"));
    assert_eq!(expand_tilde(Path::new("db/~x")), PathBuf::from("db/~x"));
  }
}
