//! The migration runner shared by both tracks.

use jotter_core::book::RemoteBook;
use jotter_store_sqlite::{SqliteStore, system};
use rusqlite::Transaction;
use tracing::info;

use crate::{
  ApiClient, ApiConfig, Error, Result,
  local::local_sequence,
  remote::remote_sequence,
};

// ─── Migrations ──────────────────────────────────────────────────────────────

/// A step that only needs what is already in the store.
pub type LocalFn = fn(&Transaction<'_>) -> Result<()>;

/// A step that also needs the server's book list. The list is fetched before
/// the transaction opens.
pub type RemoteFn = fn(&Transaction<'_>, &[RemoteBook]) -> Result<()>;

#[derive(Clone, Copy)]
pub enum Body {
  Local(LocalFn),
  Remote(RemoteFn),
}

/// One named step of a track.
#[derive(Clone, Copy)]
pub struct Migration {
  pub name: &'static str,
  pub body: Body,
}

impl Migration {
  pub const fn local(name: &'static str, f: LocalFn) -> Self {
    Self { name, body: Body::Local(f) }
  }

  pub const fn remote(name: &'static str, f: RemoteFn) -> Self {
    Self { name, body: Body::Remote(f) }
  }
}

// ─── Tracks ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
  Local,
  Remote,
}

impl Track {
  /// The `system` row holding this track's counter.
  pub fn counter_key(self) -> &'static str {
    match self {
      Track::Local => system::SCHEMA_KEY,
      Track::Remote => system::REMOTE_SCHEMA_KEY,
    }
  }
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Everything a migration run needs from the outside world.
#[derive(Clone)]
pub struct Context {
  pub store: SqliteStore,
  pub api:   ApiConfig,
}

// ─── Runner ──────────────────────────────────────────────────────────────────

/// Bring `track` up to date with `sequence`.
///
/// Without a counter row the database is a fresh install: there is nothing to
/// transform, so no step runs and the counter is written as
/// `sequence.len()`. Otherwise the steps from the counter onwards run in
/// order, and the first failure stops the run.
pub async fn run(ctx: &Context, track: Track, sequence: &[Migration]) -> Result<()> {
  let key = track.counter_key();
  let known = sequence.len();

  let Some(value) = ctx.store.read_counter(key).await? else {
    let caught_up = known as i64;
    ctx
      .store
      .transaction(move |tx| system::init_counter(tx, key, caught_up))
      .await?;
    info!(?track, counter = caught_up, "fresh install; marked migrations as applied");
    return Ok(());
  };

  let start = usize::try_from(value)
    .ok()
    .filter(|start| *start <= known)
    .ok_or(Error::IncompatibleCounter { key, value, known })?;

  if start == known {
    info!(?track, counter = value, "migrations up to date");
    return Ok(());
  }

  for migration in &sequence[start..] {
    let counter = execute(ctx, *migration, key).await?;
    info!(?track, step = migration.name, counter, "applied migration");
  }

  Ok(())
}

/// Run the local track, then the remote track.
///
/// Outstanding remote steps are left for a later run while the user is not
/// logged in. The login check happens before anything is written, so the
/// remote counter is unchanged in that case.
pub async fn run_all(ctx: &Context) -> Result<()> {
  run(ctx, Track::Local, &local_sequence()).await?;

  match run(ctx, Track::Remote, &remote_sequence()).await {
    Err(err) if err.is_login_required() => {
      info!("not logged in; remote migrations deferred");
      Ok(())
    }
    other => other,
  }
}

/// Apply one step and bump the counter under `key` in the same transaction.
/// Returns the new counter value.
pub(crate) async fn execute(
  ctx:       &Context,
  migration: Migration,
  key:       &'static str,
) -> Result<i64> {
  apply(ctx, migration, key)
    .await
    .map_err(|source| Error::Step { name: migration.name, source: Box::new(source) })
}

async fn apply(ctx: &Context, migration: Migration, key: &'static str) -> Result<i64> {
  match migration.body {
    Body::Local(f) => {
      ctx
        .store
        .transaction(move |tx| {
          f(tx)?;
          Ok::<_, Error>(system::bump_counter(tx, key)?)
        })
        .await
    }
    Body::Remote(f) => {
      // Fetched before the transaction opens; nothing is written if this fails.
      let client = ApiClient::new(ctx.api.clone())?;
      let books = client.list_books().await?;
      info!(step = migration.name, books = books.len(), "fetched server books");

      ctx
        .store
        .transaction(move |tx| {
          f(tx, &books)?;
          Ok::<_, Error>(system::bump_counter(tx, key)?)
        })
        .await
    }
  }
}
