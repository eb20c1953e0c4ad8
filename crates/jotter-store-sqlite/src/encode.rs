//! Decoding helpers between SQLite rows and domain types.

use jotter_core::{action::Action, book::Book};

use crate::Result;

/// Raw values read directly from an `actions` row.
pub struct RawAction {
  pub uuid:      String,
  pub schema:    i64,
  pub kind:      String,
  pub data:      String,
  pub timestamp: i64,
}

impl RawAction {
  /// Column order expected by [`RawAction::from_row`].
  pub const COLUMNS: &'static str = "uuid, schema, type, data, timestamp";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uuid:      row.get(0)?,
      schema:    row.get(1)?,
      kind:      row.get(2)?,
      data:      row.get(3)?,
      timestamp: row.get(4)?,
    })
  }

  pub fn into_action(self) -> Result<Action> {
    Ok(Action {
      uuid:      self.uuid,
      schema:    self.schema,
      kind:      self.kind.parse()?,
      data:      self.data,
      timestamp: self.timestamp,
    })
  }
}

pub fn book_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
  Ok(Book { uuid: row.get(0)?, label: row.get(1)? })
}
