//! Actions: the append-only log of user mutations.
//!
//! An action is written once with the payload schema current at the time and
//! never changes afterwards, except that migrations may move its payload
//! forward to a newer schema. Every payload shape that has ever been written
//! is described here so that old rows can still be read.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Error, Result};

// ─── ActionType ──────────────────────────────────────────────────────────────

/// The kind of mutation an action records. Fixed for the lifetime of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
  AddNote,
  EditNote,
  RemoveNote,
  AddBook,
  RemoveBook,
}

impl ActionType {
  pub const ALL: [ActionType; 5] = [
    Self::AddNote,
    Self::EditNote,
    Self::RemoveNote,
    Self::AddBook,
    Self::RemoveBook,
  ];

  /// The discriminant stored in the `type` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::AddNote => "add_note",
      Self::EditNote => "edit_note",
      Self::RemoveNote => "remove_note",
      Self::AddBook => "add_book",
      Self::RemoveBook => "remove_book",
    }
  }

  /// The newest payload schema for this type; new rows are written at it and
  /// the local migration track brings old rows up to it.
  pub fn latest_schema(self) -> i64 {
    match self {
      Self::AddNote | Self::EditNote => 3,
      Self::RemoveNote | Self::AddBook | Self::RemoveBook => 2,
    }
  }
}

impl fmt::Display for ActionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ActionType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "add_note" => Ok(Self::AddNote),
      "edit_note" => Ok(Self::EditNote),
      "remove_note" => Ok(Self::RemoveNote),
      "add_book" => Ok(Self::AddBook),
      "remove_book" => Ok(Self::RemoveBook),
      other => Err(Error::UnknownActionType(other.to_owned())),
    }
  }
}

// ─── Action ──────────────────────────────────────────────────────────────────

/// One row of the action log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
  pub uuid:      String,
  /// Version of the payload shape currently stored in `data`.
  pub schema:    i64,
  pub kind:      ActionType,
  /// Raw JSON payload; its shape is determined by `(kind, schema)`.
  pub data:      String,
  /// Epoch seconds at which the action happened. Never rewritten.
  pub timestamp: i64,
}

impl Action {
  /// Decode the payload into the struct for its `(kind, schema)` pair.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
    Ok(serde_json::from_str(&self.data)?)
  }

  pub fn is_latest(&self) -> bool { self.schema >= self.kind.latest_schema() }
}

// ─── add_book ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBookDataV1 {
  pub book_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBookDataV2 {
  pub book_name: String,
  pub book_uuid: String,
}

// ─── remove_book ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveBookDataV1 {
  pub book_name: String,
}

/// `book_name` is kept when upgrading from v1 so reconciliation can still
/// match the row by label after the book itself is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveBookDataV2 {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub book_name: Option<String>,
  pub book_uuid: String,
}

// ─── add_note ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNoteDataV2 {
  pub note_uuid: String,
  pub book_name: String,
  pub content:   String,
  pub public:    bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNoteDataV3 {
  pub note_uuid: String,
  pub book_uuid: String,
  pub content:   String,
  pub public:    bool,
}

// ─── edit_note ───────────────────────────────────────────────────────────────

/// The first edit payload. Books were referenced by name and there was no
/// visibility flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditNoteDataV1 {
  pub note_uuid: String,
  pub from_book: String,
  pub to_book:   String,
  pub content:   String,
}

/// Every field except `note_uuid` is optional; an absent field means the
/// edit leaves that attribute unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditNoteDataV2 {
  pub note_uuid: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub to_book:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub public:    Option<bool>,
}

/// Like [`EditNoteDataV2`] but the destination book is referenced by uuid.
/// `None` in any optional field means "no change", never "clear".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditNoteDataV3 {
  pub note_uuid: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub book_uuid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub public:    Option<bool>,
}

// ─── remove_note ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveNoteDataV1 {
  pub note_uuid: String,
  pub book_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveNoteDataV2 {
  pub note_uuid: String,
}
