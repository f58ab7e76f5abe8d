//! Application state: content catalog, config, and the injected capabilities
//! (store, verifier, link shortener, code encoder) shared by every connection.
//!
//! Nothing here holds a challenge session. Each WebSocket connection opens its
//! own `ChallengeSession` through `open_session`, so session state is always
//! an explicit value owned by one caller.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, instrument};

use crate::catalog::Catalog;
use crate::config::{load_game_config_from_env, GameConfig};
use crate::domain::{Card, GenerationParameters};
use crate::generator::{generate_card, generate_card_deck};
use crate::links::{CodeEncoder, LinkShortener, PassthroughEncoder, StubShortener};
use crate::remote::RemoteClient;
use crate::session::ChallengeSession;
use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::verifier::{StubVerifier, Verifier};

pub struct AppState {
    pub catalog: Catalog,
    pub config: GameConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub verifier: Arc<dyn Verifier>,
    pub shortener: Arc<dyn LinkShortener>,
    pub encoder: Arc<dyn CodeEncoder>,
    rng: Mutex<StdRng>,
}

impl AppState {
    /// Build state from env: load config, open the store, pick verifier/shortener.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_game_config_from_env().unwrap_or_default();

        // GAME_SEED pins every random draw, handy for reproducing a night's deck.
        let mut rng = match std::env::var("GAME_SEED").ok().and_then(|s| s.parse::<u64>().ok()) {
            Some(seed) => {
                info!(target: "zerosum_backend", seed, "Seeded random source");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        let store: Arc<dyn KeyValueStore> = match config.store.path.as_deref() {
            Some(path) => match FileStore::open(path) {
                Ok(s) => {
                    info!(target: "zerosum_backend", %path, "Using file-backed state store");
                    Arc::new(s)
                }
                Err(e) => {
                    error!(target: "zerosum_backend", %path, error = %e, "Could not open state store; falling back to memory");
                    Arc::new(MemoryStore::default())
                }
            },
            None => {
                info!(target: "zerosum_backend", "No store path configured; state lives in memory");
                Arc::new(MemoryStore::default())
            }
        };

        let (verifier, shortener): (Arc<dyn Verifier>, Arc<dyn LinkShortener>) = match RemoteClient::from_env() {
            Some(remote) => {
                info!(target: "zerosum_backend", base_url = %remote.base_url, "Remote verification enabled.");
                let remote = Arc::new(remote);
                (remote.clone(), remote)
            }
            None => {
                info!(target: "zerosum_backend", "Remote verification disabled (no VERIFIER_BASE_URL). Using fixed-probability stubs.");
                let stub = StubVerifier::seeded(config.verification, rng.gen());
                (Arc::new(stub), Arc::new(StubShortener))
            }
        };

        Self::from_parts(config, store, verifier, shortener, rng)
    }

    pub fn from_parts(
        config: GameConfig,
        store: Arc<dyn KeyValueStore>,
        verifier: Arc<dyn Verifier>,
        shortener: Arc<dyn LinkShortener>,
        rng: StdRng,
    ) -> Self {
        let catalog = Catalog::with_brands(&config.brands);
        info!(target: "card", sponsors = catalog.sponsor_count(), "Content catalog ready");
        Self {
            catalog,
            config,
            store,
            verifier,
            shortener,
            encoder: Arc::new(PassthroughEncoder),
            rng: Mutex::new(rng),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    pub fn draw_card(&self, params: &GenerationParameters) -> Card {
        self.with_rng(|rng| generate_card(&self.catalog, params, rng))
    }

    pub fn draw_deck(&self, count: usize, partial: &GenerationParameters) -> Vec<Card> {
        self.with_rng(|rng| generate_card_deck(&self.catalog, count, partial, rng))
    }

    /// Open a session for one player. Each session gets its own RNG stream
    /// derived from the shared source.
    pub fn open_session(&self, player_id: &str) -> ChallengeSession {
        let seed: u64 = self.with_rng(|rng| rng.gen());
        ChallengeSession::open(
            player_id,
            self.config.session.clone(),
            self.store.clone(),
            self.verifier.clone(),
            StdRng::seed_from_u64(seed),
        )
    }
}
