//! Settings for the `jotter` binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

pub const DEFAULT_DB_PATH: &str = "~/.jotter/jotter.db";
pub const DEFAULT_API_ENDPOINT: &str = "https://api.jotter.dev";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub db_path:      PathBuf,
  pub api_endpoint: String,
  #[serde(default)]
  pub api_key:      Option<String>,
}

impl Settings {
  /// Layer `path` (if it exists) and `JOTTER_*` variables over the defaults.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("db_path", DEFAULT_DB_PATH)?
      .set_default("api_endpoint", DEFAULT_API_ENDPOINT)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("JOTTER"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Settings = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.db_path = expand_tilde(&settings.db_path);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
