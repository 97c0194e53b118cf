//! [`SqliteStore`]: connection handling, schema setup and the import entry
//! point. Reports live in `reports.rs`.

use std::path::Path;

use crate::{
  import::{self, ImportFiles, ImportReport},
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The INSEE reference database backed by a single SQLite file.
///
/// Clones share the same background connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a database at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory database.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Create every table, index, view and trigger that does not exist yet.
  /// Safe to call on an initialised database.
  pub async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema ready");
    Ok(())
  }

  /// Load the reference files in dependency order.
  ///
  /// Row-level data problems are returned as warnings in the report. Any
  /// other failure rolls back the step in progress and aborts; steps already
  /// committed stay, and a re-run completes them idempotently.
  pub async fn import(&self, files: ImportFiles) -> Result<ImportReport> {
    self
      .conn
      .call(move |conn| Ok(import::run(conn, &files)))
      .await?
  }
}
