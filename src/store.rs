//! Key-value persistence capability for per-player durable state.
//!
//! The contract is two text operations, `get` and `set`, last write wins.
//! `MemoryStore` serves tests and config-less runs; `FileStore` keeps the
//! whole map in one JSON document on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, instrument};

use crate::domain::Reward;
use crate::error::StoreError;

pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryStore {
  map: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let map = self.map.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(map.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut map = self.map.lock().map_err(|_| StoreError::Poisoned)?;
    map.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// JSON-file store. The file is read once at open and rewritten on every `set`.
pub struct FileStore {
  path: PathBuf,
  map: Mutex<HashMap<String, String>>,
}

impl FileStore {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let path = path.as_ref().to_path_buf();
    let map = if path.exists() {
      let contents = std::fs::read_to_string(&path)?;
      if contents.trim().is_empty() { HashMap::new() } else { serde_json::from_str(&contents)? }
    } else {
      HashMap::new()
    };
    Ok(Self { path, map: Mutex::new(map) })
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let map = self.map.lock().map_err(|_| StoreError::Poisoned)?;
    Ok(map.get(key).cloned())
  }

  #[instrument(level = "debug", skip(self, value), fields(path = %self.path.display(), value_len = value.len()))]
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut map = self.map.lock().map_err(|_| StoreError::Poisoned)?;
    map.insert(key.to_string(), value.to_string());
    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() && !parent.exists() {
        std::fs::create_dir_all(parent)?;
      }
    }
    let json = serde_json::to_string_pretty(&*map)?;
    std::fs::write(&self.path, json)?;
    debug!(target: "session", %key, "State persisted");
    Ok(())
  }
}

/// Typed view over a store for one player's durable state.
#[derive(Clone)]
pub struct PlayerState<'a> {
  store: &'a dyn KeyValueStore,
  player_id: &'a str,
}

impl<'a> PlayerState<'a> {
  pub fn new(store: &'a dyn KeyValueStore, player_id: &'a str) -> Self {
    Self { store, player_id }
  }

  fn key(&self, field: &str) -> String {
    format!("zerosum:{}:{}", self.player_id, field)
  }

  pub fn load_rewards(&self) -> Result<Vec<Reward>, StoreError> {
    match self.store.get(&self.key("rewards"))? {
      Some(text) => Ok(serde_json::from_str(&text)?),
      None => Ok(Vec::new()),
    }
  }

  pub fn save_rewards(&self, rewards: &[Reward]) -> Result<(), StoreError> {
    let text = serde_json::to_string(rewards)?;
    self.store.set(&self.key("rewards"), &text)
  }

  pub fn load_intensity(&self) -> Result<u8, StoreError> {
    match self.store.get(&self.key("emotional_intensity"))? {
      Some(text) => Ok(serde_json::from_str::<u8>(text.trim())?.min(100)),
      None => Ok(0),
    }
  }

  pub fn save_intensity(&self, intensity: u8) -> Result<(), StoreError> {
    self.store.set(&self.key("emotional_intensity"), &intensity.to_string())
  }
}
