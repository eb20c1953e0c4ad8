//! `jotter`: brings a local jotter database up to date.
//!
//! # Usage
//!
//! ```text
//! jotter migrate
//! jotter --config ~/.jotter/config.toml migrate --track local
//! ```
//!
//! Settings come from the config file and `JOTTER_*` environment variables
//! (`JOTTER_DB_PATH`, `JOTTER_API_ENDPOINT`, `JOTTER_API_KEY`).

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use jotter_migrate::{
  ApiConfig, Context, Track, local::local_sequence, remote::remote_sequence, run, run_all,
};
use jotter_store_sqlite::SqliteStore;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "jotter", version, about = "Jotter note log maintenance")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "~/.jotter/config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Upgrade stored actions and reconcile book uuids with the server.
  Migrate {
    #[arg(long, value_enum, default_value_t = TrackArg::All)]
    track: TrackArg,
  },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TrackArg {
  Local,
  Remote,
  /// The local track, then the remote track once logged in.
  All,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&settings::expand_tilde(&cli.config))?;

  if let Some(dir) = settings.db_path.parent() {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }
  let store = SqliteStore::open(&settings.db_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.db_path))?;

  let ctx = Context {
    store,
    api: ApiConfig {
      endpoint:       settings.api_endpoint,
      api_key:        settings.api_key,
      client_version: env!("CARGO_PKG_VERSION").to_owned(),
    },
  };

  match cli.command {
    Command::Migrate { track } => migrate(&ctx, track).await,
  }
}

async fn migrate(ctx: &Context, track: TrackArg) -> anyhow::Result<()> {
  match track {
    TrackArg::All => run_all(ctx).await.context("migrations failed"),
    TrackArg::Local => run(ctx, Track::Local, &local_sequence())
      .await
      .context("local migrations failed"),
    TrackArg::Remote => {
      let result = run(ctx, Track::Remote, &remote_sequence()).await;
      if let Err(err) = &result
        && err.is_login_required()
      {
        eprintln!("Log in first: set `api_key` in the config file or JOTTER_API_KEY.");
      }
      result.context("remote migrations failed")
    }
  }
}
