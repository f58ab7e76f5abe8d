//! Outbound capabilities for reward and experience links: short-link creation
//! and the scannable-code encoder. Neither is implemented in-core; the stubs
//! here keep the contract honest until real services are supplied.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

const STUB_LINK_HOST: &str = "https://zs.link";

/// Structured link metadata returned by a shortener.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShortLink {
  pub code: String,
  pub short_url: String,
  pub target: String,
}

#[async_trait]
pub trait LinkShortener: Send + Sync {
  async fn shorten(&self, target: &str) -> Result<ShortLink, VerifyError>;
}

/// Deterministic stand-in: same target, same code.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubShortener;

#[async_trait]
impl LinkShortener for StubShortener {
  async fn shorten(&self, target: &str) -> Result<ShortLink, VerifyError> {
    let mut h = DefaultHasher::new();
    target.hash(&mut h);
    let code = format!("{:08x}", h.finish() as u32);
    Ok(ShortLink { short_url: format!("{STUB_LINK_HOST}/{code}"), code, target: target.to_string() })
  }
}

/// Turns a short string into something a client can render as a scannable code.
pub trait CodeEncoder: Send + Sync {
  fn encode(&self, text: &str) -> String;
}

/// Hands the text through untouched; clients render it with their own encoder.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughEncoder;

impl CodeEncoder for PassthroughEncoder {
  fn encode(&self, text: &str) -> String {
    text.to_string()
  }
}
