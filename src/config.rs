//! Loading game configuration (session tuning, verification rates, store,
//! sponsor brands) from TOML.
//!
//! Every section is optional; missing values fall back to the defaults below.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::CardRewardType;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GameConfig {
  #[serde(default)]
  pub session: SessionCfg,
  #[serde(default)]
  pub verification: VerificationCfg,
  #[serde(default)]
  pub store: StoreCfg,
  #[serde(default)]
  pub brands: Vec<BrandCfg>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
  /// Settling interval awaited by every verification, modelling the remote round trip.
  pub settle_ms: u64,
  pub social_trigger_rate: f64,
  pub reward_ttl_days: i64,
  /// Upper bound a transport waits for one verification before abandoning it.
  pub verify_timeout_ms: u64,
}

impl Default for SessionCfg {
  fn default() -> Self {
    Self { settle_ms: 1200, social_trigger_rate: 0.25, reward_ttl_days: 30, verify_timeout_ms: 15_000 }
  }
}

impl SessionCfg {
  pub fn settle_interval(&self) -> Duration {
    Duration::from_millis(self.settle_ms)
  }

  pub fn verify_timeout(&self) -> Duration {
    Duration::from_millis(self.verify_timeout_ms)
  }
}

/// Success probabilities used by the stub classifier.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerificationCfg {
  pub ai: f64,
  pub photo: f64,
  pub audio: f64,
}

impl Default for VerificationCfg {
  fn default() -> Self {
    Self { ai: 0.8, photo: 0.9, audio: 0.85 }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StoreCfg {
  /// JSON file backing the key-value store. In-memory when absent.
  #[serde(default)]
  pub path: Option<String>,
}

/// Sponsor entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct BrandCfg {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub reward_value: Option<f64>,
  #[serde(default)]
  pub reward_type: Option<CardRewardType>,
}

pub fn parse_game_config(s: &str) -> Result<GameConfig, toml::de::Error> {
  toml::from_str::<GameConfig>(s)
}

/// Attempt to load `GameConfig` from GAME_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_game_config_from_env() -> Option<GameConfig> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_game_config(&s) {
      Ok(cfg) => {
        info!(target: "zerosum_backend", %path, brands = cfg.brands.len(), "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "zerosum_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "zerosum_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
