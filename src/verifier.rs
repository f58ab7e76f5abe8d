//! Classification capability used for photo, audio and AI verification.
//!
//! Contract: accept the method and an opaque payload, answer with a verdict.
//! `StubVerifier` stands in with fixed success probabilities until a real
//! classifier is wired (see `remote::RemoteClient`).

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::VerificationCfg;
use crate::domain::VerificationMethod;
use crate::error::VerifyError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
  pub verified: bool,
  #[serde(default)]
  pub confidence: f32,
}

#[async_trait]
pub trait Verifier: Send + Sync {
  async fn classify(&self, method: VerificationMethod, payload: &str) -> Result<Verdict, VerifyError>;
}

/// Fixed-probability stand-in. Draws from its own injected RNG.
pub struct StubVerifier {
  rates: VerificationCfg,
  rng: Mutex<StdRng>,
}

impl StubVerifier {
  pub fn new(rates: VerificationCfg, rng: StdRng) -> Self {
    Self { rates, rng: Mutex::new(rng) }
  }

  pub fn seeded(rates: VerificationCfg, seed: u64) -> Self {
    Self::new(rates, StdRng::seed_from_u64(seed))
  }

  /// Every classified method succeeds (or fails) unconditionally.
  pub fn always(verified: bool) -> Self {
    let p = if verified { 1.0 } else { 0.0 };
    Self::seeded(VerificationCfg { ai: p, photo: p, audio: p }, 0)
  }

  fn rate_for(&self, method: VerificationMethod) -> f64 {
    match method {
      VerificationMethod::Ai => self.rates.ai,
      VerificationMethod::Photo => self.rates.photo,
      VerificationMethod::Audio => self.rates.audio,
      _ => 1.0,
    }
  }
}

#[async_trait]
impl Verifier for StubVerifier {
  #[instrument(level = "debug", skip(self, method, payload), fields(%method, payload_len = payload.len()))]
  async fn classify(&self, method: VerificationMethod, payload: &str) -> Result<Verdict, VerifyError> {
    let rate = self.rate_for(method).clamp(0.0, 1.0);
    let verified = {
      let mut rng = self.rng.lock().map_err(|_| VerifyError::Unavailable)?;
      rng.gen_bool(rate)
    };
    debug!(target: "session", %method, rate, verified, "Stub classification");
    Ok(Verdict { verified, confidence: rate as f32 })
  }
}
