//! [`SqliteStore`], the async handle over the jotter database.

use std::path::Path;

use jotter_core::{
  action::{Action, ActionType},
  book::Book,
};
use rusqlite::{Connection, Transaction};

use crate::{actions, books, schema::SCHEMA, system, Error, Result};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A jotter store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against the connection outside of any explicit transaction.
  pub async fn with_conn<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&Connection) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }

  /// Run `f` as one unit of work.
  ///
  /// The transaction commits only if `f` returns `Ok`; on error it is dropped
  /// and rolled back, and the error comes back to the caller as the same
  /// value `f` returned.
  pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
  where
    F: FnOnce(&Transaction<'_>) -> Result<R, E> + Send + 'static,
    R: Send + 'static,
    E: From<Error> + std::error::Error + Send + Sync + 'static,
  {
    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = f(&tx).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        tx.commit()?;
        Ok(out)
      })
      .await;

    result.map_err(|err| match err {
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<E>() {
        Ok(e) => *e,
        Err(inner) => E::from(Error::from(tokio_rusqlite::Error::Other(inner))),
      },
      other => E::from(Error::from(other)),
    })
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  pub async fn get_action(&self, uuid: &str) -> Result<Option<Action>> {
    let uuid = uuid.to_owned();
    self.with_conn(move |conn| actions::get_action(conn, &uuid)).await
  }

  pub async fn list_actions(&self) -> Result<Vec<Action>> {
    self.with_conn(actions::all_actions).await
  }

  pub async fn list_actions_at(&self, kind: ActionType, schema: i64) -> Result<Vec<Action>> {
    self
      .with_conn(move |conn| actions::actions_at(conn, kind, schema))
      .await
  }

  // ── Books ─────────────────────────────────────────────────────────────────

  pub async fn add_book(&self, label: &str) -> Result<Book> {
    let label = label.to_owned();
    self.with_conn(move |conn| books::add_book(conn, &label)).await
  }

  pub async fn insert_book(&self, uuid: &str, label: &str) -> Result<()> {
    let (uuid, label) = (uuid.to_owned(), label.to_owned());
    self
      .with_conn(move |conn| books::insert_book(conn, &uuid, &label))
      .await
  }

  pub async fn book_uuid_by_label(&self, label: &str) -> Result<Option<String>> {
    let label = label.to_owned();
    self
      .with_conn(move |conn| books::find_book_uuid(conn, &label))
      .await
  }

  pub async fn book_label_by_uuid(&self, uuid: &str) -> Result<Option<String>> {
    let uuid = uuid.to_owned();
    self
      .with_conn(move |conn| books::find_book_label(conn, &uuid))
      .await
  }

  pub async fn list_books(&self) -> Result<Vec<Book>> {
    self.with_conn(books::all_books).await
  }

  // ── Schema counters ───────────────────────────────────────────────────────

  pub async fn read_counter(&self, key: &'static str) -> Result<Option<i64>> {
    self
      .with_conn(move |conn| system::read_counter(conn, key))
      .await
  }
}
