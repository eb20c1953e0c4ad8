//! Schema counters kept in the `system` table.
//!
//! Each counter holds the number of migrations already applied on its track.
//! A missing row means the database was never migrated (a fresh install).

use rusqlite::{Connection, OptionalExtension as _};

use crate::{Error, Result};

/// Counter for the local payload migrations.
pub const SCHEMA_KEY: &str = "schema";

/// Counter for the remote reconciliation migrations.
pub const REMOTE_SCHEMA_KEY: &str = "remote_schema";

pub fn read_counter(conn: &Connection, key: &str) -> Result<Option<i64>> {
  Ok(
    conn
      .query_row(
        "SELECT value FROM system WHERE key = ?1",
        rusqlite::params![key],
        |r| r.get(0),
      )
      .optional()?,
  )
}

/// Create the counter row. Fails if it already exists.
pub fn init_counter(conn: &Connection, key: &str, value: i64) -> Result<()> {
  conn.execute(
    "INSERT INTO system (key, value) VALUES (?1, ?2)",
    rusqlite::params![key, value],
  )?;
  Ok(())
}

/// Increment an existing counter by one and return the new value.
pub fn bump_counter(conn: &Connection, key: &str) -> Result<i64> {
  let updated = conn.execute(
    "UPDATE system SET value = value + 1 WHERE key = ?1",
    rusqlite::params![key],
  )?;
  if updated == 0 {
    return Err(Error::CounterMissing { key: key.to_owned() });
  }
  read_counter(conn, key)?.ok_or_else(|| Error::CounterMissing { key: key.to_owned() })
}
