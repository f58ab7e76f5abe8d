//! WebSocket upgrade + message loop. One connection is one player session:
//! the loop owns its `ChallengeSession`, `PlayerProgress` and the cards dealt
//! to it (only those can be started), parses each text
//! frame as a `ClientWsMessage` and replies with a single JSON message.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::domain::PlayerProgress;
use crate::logic::{handle_session_command, DealtCards};
use crate::protocol::{ClientWsMessage, ServerWsMessage, WsQuery};
use crate::state::AppState;

const GUEST_PLAYER: &str = "guest";

#[instrument(level = "info", skip(ws, state, q))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  Query(q): Query<WsQuery>,
) -> impl IntoResponse {
  let player = q.player.filter(|p| !p.trim().is_empty()).unwrap_or_else(|| GUEST_PLAYER.to_string());
  let name = q.name.unwrap_or_else(|| player.clone());
  info!(target: "zerosum_backend", %player, "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state, player, name))
}

#[instrument(level = "info", skip(socket, state, name))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, player: String, name: String) {
  let mut session = state.open_session(&player);
  let mut progress = PlayerProgress::new(player.as_str(), name);
  let mut dealt = DealtCards::default();
  info!(target: "zerosum_backend", intensity = session.emotional_intensity(), "WebSocket connected");

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "session", "WS received: {:?}", &incoming);
            handle_session_command(&state, &mut session, &mut progress, &mut dealt, incoming).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e), session: None },
        };

        let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "zerosum_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(
    target: "zerosum_backend",
    completed = progress.completed_cards.len(),
    tier = ?progress.tier,
    undealt = dealt.len(),
    "WebSocket disconnected"
  );
}
