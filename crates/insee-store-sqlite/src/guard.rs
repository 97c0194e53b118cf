//! Scoped suspension of integrity enforcement for the bulk loader.

use rusqlite::Connection;

use crate::{Error, Result};

const SUSPEND: &str = "
PRAGMA foreign_keys = OFF;
UPDATE import_lock SET locked = 0 WHERE id = 1;
";

const RESTORE: &str = "
UPDATE import_lock SET locked = 1 WHERE id = 1;
PRAGMA foreign_keys = ON;
";

/// While alive, foreign keys are not enforced and the protective triggers on
/// `region` and `departement` do not fire. Dropping the guard restores both,
/// whichever way the import ends.
///
/// Must be engaged outside a transaction: SQLite ignores
/// `PRAGMA foreign_keys` inside one.
pub(crate) struct ImportGuard<'c> {
  conn: &'c Connection,
}

impl<'c> ImportGuard<'c> {
  pub fn engage(conn: &'c Connection) -> Result<Self> {
    if !conn.is_autocommit() {
      return Err(Error::TransactionOpen);
    }
    conn.execute_batch(SUSPEND)?;
    tracing::debug!("integrity enforcement suspended");
    Ok(Self { conn })
  }
}

impl Drop for ImportGuard<'_> {
  fn drop(&mut self) {
    match self.conn.execute_batch(RESTORE) {
      Ok(()) => tracing::debug!("integrity enforcement restored"),
      Err(e) => tracing::error!(error = %e, "failed to restore integrity enforcement"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::SCHEMA;

  fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
  }

  fn state(conn: &Connection) -> (i64, i64) {
    let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
    let locked: i64 = conn
      .query_row("SELECT locked FROM import_lock WHERE id = 1", [], |r| r.get(0))
      .unwrap();
    (fk, locked)
  }

  #[test]
  fn suspends_and_restores() {
    let conn = conn();
    assert_eq!(state(&conn), (1, 1));
    {
      let _guard = ImportGuard::engage(&conn).unwrap();
      assert_eq!(state(&conn), (0, 0));
      conn
        .execute("INSERT INTO region (reg_id, name) VALUES ('11', 'Île-de-France')", [])
        .unwrap();
    }
    assert_eq!(state(&conn), (1, 1));
    let err = conn.execute("DELETE FROM region", []).unwrap_err();
    assert!(err.to_string().contains("read-only"));
  }

  #[test]
  fn refuses_inside_a_transaction() {
    let conn = conn();
    let tx = conn.unchecked_transaction().unwrap();
    assert!(matches!(ImportGuard::engage(&tx), Err(Error::TransactionOpen)));
  }
}
