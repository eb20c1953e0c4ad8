//! Error type for `jotter-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] jotter_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// No book carries the given label.
  #[error("book not found for label {label:?}")]
  BookNotFound { label: String },

  /// No book carries the given uuid.
  #[error("book not found for uuid {uuid:?}")]
  BookUuidNotFound { uuid: String },

  #[error("schema counter {key:?} is missing")]
  CounterMissing { key: String },

  #[error("action not found: {0}")]
  ActionNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// Errors raised inside a `call` closure travel as `Other` and are recovered
// here, so callers see the variant that was raised.
impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Rusqlite(e) => Error::Sqlite(e),
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
        Ok(e) => *e,
        Err(inner) => Error::Database(tokio_rusqlite::Error::Other(inner)),
      },
      other => Error::Database(other),
    }
  }
}

impl From<Error> for tokio_rusqlite::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Database(inner) => inner,
      Error::Sqlite(e) => tokio_rusqlite::Error::Rusqlite(e),
      other => tokio_rusqlite::Error::Other(Box::new(other)),
    }
  }
}
