//! Action Store accessors.
//!
//! Rows are appended with [`insert_action`] (or one of the typed `log_*`
//! producers, which always write the newest payload schema) and afterwards
//! only touched by migrations through [`upgrade_action`] and
//! [`rewrite_action_data`].

use chrono::Utc;
use jotter_core::action::{
  Action, ActionType, AddBookDataV2, AddNoteDataV3, EditNoteDataV3,
  RemoveBookDataV2, RemoveNoteDataV2,
};
use rusqlite::{Connection, OptionalExtension as _};
use serde::Serialize;
use uuid::Uuid;

use crate::{encode::RawAction, Error, Result};

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Append an action with a freshly generated uuid and return that uuid.
pub fn insert_action(
  conn:      &Connection,
  schema:    i64,
  kind:      ActionType,
  data:      &str,
  timestamp: i64,
) -> Result<String> {
  let uuid = Uuid::new_v4().to_string();
  insert_action_with_uuid(conn, &uuid, schema, kind, data, timestamp)?;
  Ok(uuid)
}

/// Append an action whose uuid is chosen by the caller.
pub fn insert_action_with_uuid(
  conn:      &Connection,
  uuid:      &str,
  schema:    i64,
  kind:      ActionType,
  data:      &str,
  timestamp: i64,
) -> Result<()> {
  conn.execute(
    "INSERT INTO actions (uuid, schema, type, data, timestamp)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![uuid, schema, kind.as_str(), data, timestamp],
  )?;
  Ok(())
}

/// Replace a row's payload and move it to `schema`.
pub fn upgrade_action(
  conn:   &Connection,
  uuid:   &str,
  data:   &str,
  schema: i64,
) -> Result<()> {
  let updated = conn.execute(
    "UPDATE actions SET data = ?1, schema = ?2 WHERE uuid = ?3",
    rusqlite::params![data, schema, uuid],
  )?;
  if updated == 0 {
    return Err(Error::ActionNotFound(uuid.to_owned()));
  }
  Ok(())
}

/// Replace a row's payload without touching its schema.
pub fn rewrite_action_data(conn: &Connection, uuid: &str, data: &str) -> Result<()> {
  let updated = conn.execute(
    "UPDATE actions SET data = ?1 WHERE uuid = ?2",
    rusqlite::params![data, uuid],
  )?;
  if updated == 0 {
    return Err(Error::ActionNotFound(uuid.to_owned()));
  }
  Ok(())
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn get_action(conn: &Connection, uuid: &str) -> Result<Option<Action>> {
  let sql = format!("SELECT {} FROM actions WHERE uuid = ?1", RawAction::COLUMNS);
  conn
    .query_row(&sql, rusqlite::params![uuid], RawAction::from_row)
    .optional()?
    .map(RawAction::into_action)
    .transpose()
}

/// Every action in log order.
pub fn all_actions(conn: &Connection) -> Result<Vec<Action>> {
  let sql = format!(
    "SELECT {} FROM actions ORDER BY timestamp, rowid",
    RawAction::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map([], RawAction::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawAction::into_action).collect()
}

/// Every action of `kind` whose payload is currently at `schema`.
pub fn actions_at(conn: &Connection, kind: ActionType, schema: i64) -> Result<Vec<Action>> {
  let sql = format!(
    "SELECT {} FROM actions WHERE type = ?1 AND schema = ?2 ORDER BY timestamp, rowid",
    RawAction::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(rusqlite::params![kind.as_str(), schema], RawAction::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawAction::into_action).collect()
}

// ─── Producers ───────────────────────────────────────────────────────────────

fn log_latest<T: Serialize>(
  conn:      &Connection,
  kind:      ActionType,
  data:      &T,
  timestamp: i64,
) -> Result<String> {
  let json = serde_json::to_string(data)?;
  insert_action(conn, kind.latest_schema(), kind, &json, timestamp)
}

pub fn log_add_note(
  conn:      &Connection,
  note_uuid: &str,
  book_uuid: &str,
  content:   &str,
  timestamp: i64,
) -> Result<String> {
  let data = AddNoteDataV3 {
    note_uuid: note_uuid.to_owned(),
    book_uuid: book_uuid.to_owned(),
    content:   content.to_owned(),
    public:    false,
  };
  log_latest(conn, ActionType::AddNote, &data, timestamp)
}

/// Only the content is recorded; book and visibility are left unchanged.
pub fn log_edit_note(
  conn:      &Connection,
  note_uuid: &str,
  content:   &str,
  timestamp: i64,
) -> Result<String> {
  let data = EditNoteDataV3 {
    note_uuid: note_uuid.to_owned(),
    book_uuid: None,
    content:   Some(content.to_owned()),
    public:    None,
  };
  log_latest(conn, ActionType::EditNote, &data, timestamp)
}

pub fn log_remove_note(conn: &Connection, note_uuid: &str) -> Result<String> {
  let data = RemoveNoteDataV2 { note_uuid: note_uuid.to_owned() };
  log_latest(conn, ActionType::RemoveNote, &data, Utc::now().timestamp())
}

pub fn log_add_book(conn: &Connection, book_name: &str, book_uuid: &str) -> Result<String> {
  let data = AddBookDataV2 {
    book_name: book_name.to_owned(),
    book_uuid: book_uuid.to_owned(),
  };
  log_latest(conn, ActionType::AddBook, &data, Utc::now().timestamp())
}

pub fn log_remove_book(
  conn:      &Connection,
  book_name: &str,
  book_uuid: &str,
) -> Result<String> {
  let data = RemoveBookDataV2 {
    book_name: Some(book_name.to_owned()),
    book_uuid: book_uuid.to_owned(),
  };
  log_latest(conn, ActionType::RemoveBook, &data, Utc::now().timestamp())
}
