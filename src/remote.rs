//! Minimal HTTP client for a remote verification / link service.
//!
//! Enabled when VERIFIER_BASE_URL is set. Two JSON endpoints are used:
//!   POST {base}/verify  {method, payload}  -> {verified, confidence}
//!   POST {base}/links   {target}           -> {code, short_url, target}
//!
//! NOTE: We never log the API key or payload contents, only sizes and latencies.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::domain::VerificationMethod;
use crate::error::VerifyError;
use crate::links::{LinkShortener, ShortLink};
use crate::verifier::{Verdict, Verifier};

#[derive(Clone)]
pub struct RemoteClient {
  pub client: reqwest::Client,
  pub api_key: Option<String>,
  pub base_url: String,
}

#[derive(Serialize)]
struct VerifyReq<'a> {
  method: VerificationMethod,
  payload: &'a str,
}

#[derive(Serialize)]
struct LinkReq<'a> {
  target: &'a str,
}

impl RemoteClient {
  /// Construct the client if we find VERIFIER_BASE_URL; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let base_url = std::env::var("VERIFIER_BASE_URL").ok()?;
    let api_key = std::env::var("VERIFIER_API_KEY").ok();

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string() })
  }

  #[instrument(level = "info", skip(self, path, body), fields(%path))]
  async fn post_json<B: Serialize + Sync, T: for<'a> Deserialize<'a>>(&self, path: &str, body: &B) -> Result<T, VerifyError> {
    let url = format!("{}{}", self.base_url, path);
    let mut req = self
      .client
      .post(&url)
      .header(USER_AGENT, "zerosum-backend/0.1")
      .header(CONTENT_TYPE, "application/json");
    if let Some(key) = &self.api_key {
      req = req.header(AUTHORIZATION, format!("Bearer {}", key));
    }

    let start = std::time::Instant::now();
    let res = req.json(body).send().await?;
    let elapsed = start.elapsed();

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_remote_error(&body).unwrap_or(body);
      error!(target: "session", %url, status, ?elapsed, "Remote call failed");
      return Err(VerifyError::Status { status, message });
    }

    info!(target: "session", %url, ?elapsed, "Remote call succeeded");
    Ok(res.json::<T>().await?)
  }
}

#[async_trait]
impl Verifier for RemoteClient {
  #[instrument(level = "info", skip(self, method, payload), fields(%method, payload_len = payload.len()))]
  async fn classify(&self, method: VerificationMethod, payload: &str) -> Result<Verdict, VerifyError> {
    self.post_json("/verify", &VerifyReq { method, payload }).await
  }
}

#[async_trait]
impl LinkShortener for RemoteClient {
  #[instrument(level = "info", skip(self, target), fields(target_len = target.len()))]
  async fn shorten(&self, target: &str) -> Result<ShortLink, VerifyError> {
    self.post_json("/links", &LinkReq { target }).await
  }
}

/// Try to extract a clean error message from an `{"error": {"message": ...}}` body.
fn extract_remote_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
