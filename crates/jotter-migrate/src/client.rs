//! Async HTTP client for the jotter sync service.
//!
//! Only the book listing is needed here: reconciliation reads the server's
//! `{uuid, label}` pairs once and does everything else locally.

use std::time::Duration;

use jotter_core::book::RemoteBook;
use reqwest::Client;

use crate::{Error, Result};

/// Connection settings for the sync service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub endpoint:       String,
  /// Absent or empty until the user logs in.
  pub api_key:        Option<String>,
  /// Sent as `CLI-Version` so the server can reject outdated clients.
  pub client_version: String,
}

impl ApiConfig {
  pub fn api_key(&self) -> Option<&str> {
    self.api_key.as_deref().filter(|k| !k.is_empty())
  }
}

/// Async HTTP client for the sync service.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:  Client,
  config:  ApiConfig,
  api_key: String,
}

impl ApiClient {
  /// Fails with [`Error::LoginRequired`] when no API key is configured.
  pub fn new(config: ApiConfig) -> Result<Self> {
    let api_key = config.api_key().ok_or(Error::LoginRequired)?.to_owned();
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, config, api_key })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
  }

  /// `GET /v1/books`
  pub async fn list_books(&self) -> Result<Vec<RemoteBook>> {
    let url = self.url("/v1/books");
    let resp = self
      .client
      .get(&url)
      .header(reqwest::header::AUTHORIZATION, &self.api_key)
      .header("CLI-Version", &self.config.client_version)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::Status { method: "GET", url, status: resp.status() });
    }
    Ok(resp.json().await?)
  }
}
