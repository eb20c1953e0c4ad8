//! Book accessors.
//!
//! Lookups go by label against the current table contents. Books are never
//! deleted here; a removed book's label stays resolvable for migrations of
//! older actions.

use jotter_core::book::Book;
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use crate::{encode::book_from_row, Error, Result};

pub fn insert_book(conn: &Connection, uuid: &str, label: &str) -> Result<()> {
  conn.execute(
    "INSERT INTO books (uuid, label) VALUES (?1, ?2)",
    rusqlite::params![uuid, label],
  )?;
  Ok(())
}

/// Create a book with a locally generated uuid.
pub fn add_book(conn: &Connection, label: &str) -> Result<Book> {
  let book = Book { uuid: Uuid::new_v4().to_string(), label: label.to_owned() };
  insert_book(conn, &book.uuid, &book.label)?;
  Ok(book)
}

pub fn find_book_uuid(conn: &Connection, label: &str) -> Result<Option<String>> {
  Ok(
    conn
      .query_row(
        "SELECT uuid FROM books WHERE label = ?1",
        rusqlite::params![label],
        |r| r.get(0),
      )
      .optional()?,
  )
}

pub fn find_book_label(conn: &Connection, uuid: &str) -> Result<Option<String>> {
  Ok(
    conn
      .query_row(
        "SELECT label FROM books WHERE uuid = ?1",
        rusqlite::params![uuid],
        |r| r.get(0),
      )
      .optional()?,
  )
}

/// Like [`find_book_uuid`] but a missing label is an error.
pub fn book_uuid_by_label(conn: &Connection, label: &str) -> Result<String> {
  find_book_uuid(conn, label)?
    .ok_or_else(|| Error::BookNotFound { label: label.to_owned() })
}

/// Like [`find_book_label`] but a missing uuid is an error.
pub fn book_label_by_uuid(conn: &Connection, uuid: &str) -> Result<String> {
  find_book_label(conn, uuid)?
    .ok_or_else(|| Error::BookUuidNotFound { uuid: uuid.to_owned() })
}

/// Point the book labelled `label` at a new uuid. Returns whether a row
/// changed.
pub fn set_book_uuid(conn: &Connection, label: &str, uuid: &str) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE books SET uuid = ?1 WHERE label = ?2",
    rusqlite::params![uuid, label],
  )?;
  Ok(updated > 0)
}

pub fn all_books(conn: &Connection) -> Result<Vec<Book>> {
  let mut stmt = conn.prepare("SELECT uuid, label FROM books ORDER BY label")?;
  let books = stmt
    .query_map([], book_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(books)
}
