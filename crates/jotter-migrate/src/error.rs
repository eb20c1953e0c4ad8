//! Error types for `jotter-migrate`.

use jotter_core::action::ActionType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[from] jotter_store_sqlite::Error),

  #[error("payload error: {0}")]
  Core(#[from] jotter_core::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// No API key is configured. The user has to log in before retrying.
  #[error("login required")]
  LoginRequired,

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{method} {url} → {status}")]
  Status {
    method: &'static str,
    url:    String,
    status: reqwest::StatusCode,
  },

  #[error("unsupported schema {schema} for {kind}")]
  UnexpectedSchema { kind: ActionType, schema: i64 },

  /// The stored counter does not fit the sequence being run, e.g. the
  /// database was migrated by a newer client.
  #[error("schema counter {key:?} is {value} but only {known} migrations are known")]
  IncompatibleCounter {
    key:   &'static str,
    value: i64,
    known: usize,
  },

  #[error("{kind} action {uuid}: {source}")]
  Action {
    kind:   ActionType,
    uuid:   String,
    source: Box<Error>,
  },

  #[error("migration {name:?}: {source}")]
  Step {
    name:   &'static str,
    source: Box<Error>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self { Error::Store(err.into()) }
}

/// Broad classes of failure, so callers can decide between prompting for a
/// login, suggesting a retry, or reporting corrupt data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A referenced book or an expected payload schema could not be found.
  Resolution,
  /// No credentials are available.
  Authentication,
  /// The remote service could not be reached or answered badly. Nothing has
  /// been written, so retrying is safe.
  Transport,
  /// The database itself failed.
  Storage,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    use jotter_store_sqlite::Error as StoreError;

    match self {
      Error::Action { source, .. } | Error::Step { source, .. } => source.kind(),
      Error::LoginRequired => ErrorKind::Authentication,
      Error::Http(_) | Error::Status { .. } => ErrorKind::Transport,
      Error::Core(_) | Error::Json(_) | Error::UnexpectedSchema { .. } => {
        ErrorKind::Resolution
      }
      Error::IncompatibleCounter { .. } => ErrorKind::Storage,
      Error::Store(e) => match e {
        StoreError::BookNotFound { .. }
        | StoreError::BookUuidNotFound { .. }
        | StoreError::Core(_)
        | StoreError::Json(_) => ErrorKind::Resolution,
        _ => ErrorKind::Storage,
      },
    }
  }

  pub fn is_login_required(&self) -> bool { self.kind() == ErrorKind::Authentication }

  pub(crate) fn in_action(self, kind: ActionType, uuid: &str) -> Self {
    Error::Action { kind, uuid: uuid.to_owned(), source: Box::new(self) }
  }
}
