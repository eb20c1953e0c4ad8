//! Local payload migrations.
//!
//! Each step upgrades every row of one action type from one payload schema to
//! the next. Rows at any other schema are never read, so a step that already
//! ran finds nothing to do. Book references are resolved by label against the
//! current `books` table; a label that does not resolve fails the whole step.

use jotter_core::action::{
  ActionType, AddBookDataV1, AddBookDataV2, AddNoteDataV2, AddNoteDataV3,
  EditNoteDataV1, EditNoteDataV2, EditNoteDataV3, RemoveBookDataV1,
  RemoveBookDataV2, RemoveNoteDataV1, RemoveNoteDataV2,
};
use jotter_store_sqlite::{actions, books};
use rusqlite::Transaction;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{Migration, Result};

/// The local track, in the order the steps must run.
pub fn local_sequence() -> Vec<Migration> {
  vec![
    Migration::local("upgrade-edit-note-from-v1-to-v3", edit_note_v1_to_v3),
    Migration::local("upgrade-edit-note-from-v2-to-v3", edit_note_v2_to_v3),
    Migration::local("upgrade-add-note-from-v2-to-v3", add_note_v2_to_v3),
    Migration::local("upgrade-remove-note-from-v1-to-v2", remove_note_v1_to_v2),
    Migration::local("upgrade-add-book-from-v1-to-v2", add_book_v1_to_v2),
    Migration::local("upgrade-remove-book-from-v1-to-v2", remove_book_v1_to_v2),
  ]
}

/// Rewrite every `kind` row at schema `from` with `f`, moving it to `to`.
fn upgrade_rows<Old, New>(
  tx:   &Transaction<'_>,
  kind: ActionType,
  from: i64,
  to:   i64,
  f:    impl Fn(&Transaction<'_>, Old) -> Result<New>,
) -> Result<()>
where
  Old: DeserializeOwned,
  New: Serialize,
{
  for action in actions::actions_at(tx, kind, from)? {
    let upgrade = || -> Result<()> {
      let new = f(tx, action.decode()?)?;
      let data = serde_json::to_string(&new)?;
      actions::upgrade_action(tx, &action.uuid, &data, to)?;
      Ok(())
    };
    upgrade().map_err(|e| e.in_action(kind, &action.uuid))?;
    debug!(uuid = %action.uuid, %kind, from, to, "upgraded action");
  }
  Ok(())
}

/// v1 edits could neither move a note nor change its visibility.
fn edit_note_v1_to_v3(tx: &Transaction<'_>) -> Result<()> {
  upgrade_rows(tx, ActionType::EditNote, 1, 3, |_, old: EditNoteDataV1| {
    Ok(EditNoteDataV3 {
      note_uuid: old.note_uuid,
      book_uuid: None,
      content:   Some(old.content),
      public:    Some(false),
    })
  })
}

fn edit_note_v2_to_v3(tx: &Transaction<'_>) -> Result<()> {
  upgrade_rows(tx, ActionType::EditNote, 2, 3, |tx, old: EditNoteDataV2| {
    let book_uuid = old
      .to_book
      .as_deref()
      .map(|label| books::book_uuid_by_label(tx, label))
      .transpose()?;

    Ok(EditNoteDataV3 {
      note_uuid: old.note_uuid,
      book_uuid,
      content: old.content,
      public: old.public,
    })
  })
}

fn add_note_v2_to_v3(tx: &Transaction<'_>) -> Result<()> {
  upgrade_rows(tx, ActionType::AddNote, 2, 3, |tx, old: AddNoteDataV2| {
    Ok(AddNoteDataV3 {
      book_uuid: books::book_uuid_by_label(tx, &old.book_name)?,
      note_uuid: old.note_uuid,
      content:   old.content,
      public:    old.public,
    })
  })
}

fn remove_note_v1_to_v2(tx: &Transaction<'_>) -> Result<()> {
  upgrade_rows(tx, ActionType::RemoveNote, 1, 2, |_, old: RemoveNoteDataV1| {
    Ok(RemoveNoteDataV2 { note_uuid: old.note_uuid })
  })
}

fn add_book_v1_to_v2(tx: &Transaction<'_>) -> Result<()> {
  upgrade_rows(tx, ActionType::AddBook, 1, 2, |tx, old: AddBookDataV1| {
    Ok(AddBookDataV2 {
      book_uuid: books::book_uuid_by_label(tx, &old.book_name)?,
      book_name: old.book_name,
    })
  })
}

fn remove_book_v1_to_v2(tx: &Transaction<'_>) -> Result<()> {
  upgrade_rows(tx, ActionType::RemoveBook, 1, 2, |tx, old: RemoveBookDataV1| {
    Ok(RemoveBookDataV2 {
      book_uuid: books::book_uuid_by_label(tx, &old.book_name)?,
      book_name: Some(old.book_name),
    })
  })
}
