//! ZeroSum · party challenge card backend
//!
//! - Axum HTTP + WebSocket API (one WebSocket connection per player session)
//! - Procedural challenge cards, verification, tiers and rewards
//! - Optional remote verification / short-link service (via environment variables)
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   GAME_CONFIG_PATH   : path to TOML config (session tuning, rates, store, brands)
//!   GAME_SEED          : u64 seed pinning every random draw
//!   VERIFIER_BASE_URL  : enables the remote verifier + shortener if present
//!   VERIFIER_API_KEY   : bearer token sent to the remote service
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod catalog;
mod generator;
mod tiers;
mod store;
mod ledger;
mod verifier;
mod links;
mod remote;
mod config;
mod session;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::routes::build_router;
use crate::state::AppState;

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "zerosum_backend", error = %e, "Could not listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
  info!(target: "zerosum_backend", "Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: catalog, config, store, verifier, shortener.
  let state = Arc::new(AppState::new());

  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "zerosum_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  Ok(())
}
