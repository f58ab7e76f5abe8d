//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::domain::GenerationParameters;
use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, params))]
pub async fn http_post_card(
  State(state): State<Arc<AppState>>,
  Json(params): Json<GenerationParameters>,
) -> impl IntoResponse {
  Json(do_generate_card(&state, &params))
}

#[instrument(level = "info", skip(state, body), fields(count = body.count))]
pub async fn http_post_deck(
  State(state): State<Arc<AppState>>,
  Json(body): Json<DeckIn>,
) -> impl IntoResponse {
  Json(do_generate_deck(&state, body.count, &body.params))
}

#[instrument(level = "info", fields(completed = q.completed, score = q.score))]
pub async fn http_get_tier(Query(q): Query<TierQuery>) -> impl IntoResponse {
  let out = tier_preview(q.completed, q.score);
  info!(target: "session", tier = ?out.tier, rewards = out.rewards.len(), "HTTP tier preview served");
  Json(out)
}

#[instrument(level = "info", skip(state, body), fields(target_len = body.target.len()))]
pub async fn http_post_link(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LinkIn>,
) -> impl IntoResponse {
  let link = do_shorten(&state, &body.target).await;
  Json(LinkOut { link })
}
