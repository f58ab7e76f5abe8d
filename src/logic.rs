//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Card and deck generation with request bounds applied
//!   - Tier previews
//!   - Short-link creation with stub fallback
//!   - Driving one session command and folding the result into a reply

use std::collections::VecDeque;

use tracing::{error, info, instrument, warn};

use crate::domain::{Card, GenerationParameters, PlayerProgress, Reward, VerificationData, VerificationMethod};
use crate::links::{LinkShortener, ShortLink, StubShortener};
use crate::protocol::{ClientWsMessage, RewardOut, ServerWsMessage, TierOut};
use crate::session::ChallengeSession;
use crate::state::AppState;
use crate::tiers::{calculate_available_rewards, calculate_user_tier, update_user_progress};

/// Largest deck a single request may ask for (one full 54-card box).
pub const MAX_DECK_SIZE: usize = 54;

#[instrument(level = "info", skip(state, params))]
pub fn do_generate_card(state: &AppState, params: &GenerationParameters) -> Card {
  let card = state.draw_card(params);
  info!(target: "card", card_id = %card.card_id, kind = %card.challenge_type, method = %card.verification_method, "Card served");
  card
}

#[instrument(level = "info", skip(state, count, partial), fields(%count))]
pub fn do_generate_deck(state: &AppState, count: usize, partial: &GenerationParameters) -> Vec<Card> {
  let count = count.min(MAX_DECK_SIZE);
  let deck = state.draw_deck(count, partial);
  info!(target: "card", size = deck.len(), "Deck served");
  deck
}

/// Cards served to one connection and not yet started. A session only ever
/// starts a card taken from here, so clients cannot supply their own.
#[derive(Debug, Default)]
pub struct DealtCards {
  cards: VecDeque<Card>,
}

impl DealtCards {
  /// Remember a served card. Oldest cards fall off past `MAX_DECK_SIZE`.
  pub fn deal(&mut self, card: Card) {
    if self.cards.len() >= MAX_DECK_SIZE {
      self.cards.pop_front();
    }
    self.cards.push_back(card);
  }

  /// Remove and return the card with this id, if it was served here.
  pub fn take(&mut self, card_id: &str) -> Option<Card> {
    let idx = self.cards.iter().position(|c| c.card_id == card_id)?;
    self.cards.remove(idx)
  }

  pub fn len(&self) -> usize {
    self.cards.len()
  }
}

pub fn tier_preview(completed: usize, score: u8) -> TierOut {
  let tier = calculate_user_tier(completed, score.min(100));
  TierOut { tier, rewards: calculate_available_rewards(tier).into_iter().map(str::to_string).collect() }
}

#[instrument(level = "info", skip(state, target), fields(target_len = target.len()))]
pub async fn do_shorten(state: &AppState, target: &str) -> ShortLink {
  match state.shortener.shorten(target).await {
    Ok(link) => link,
    Err(e) => {
      error!(target: "zerosum_backend", error = %e, "Short-link service failed; using stub link.");
      StubShortener.shorten(target).await.unwrap_or_else(|_| ShortLink {
        code: String::new(),
        short_url: target.to_string(),
        target: target.to_string(),
      })
    }
  }
}

pub fn reward_out(state: &AppState, reward: Reward) -> RewardOut {
  let redemption_code = state.encoder.encode(&reward.redemption_payload());
  RewardOut { reward, redemption_code }
}

fn error_reply(session: &ChallengeSession, message: String) -> ServerWsMessage {
  ServerWsMessage::Error { message, session: Some(session.snapshot()) }
}

/// Resolve one verification and, on success, feed the result into player progress.
async fn verify_and_progress(
  state: &AppState,
  session: &mut ChallengeSession,
  progress: &mut PlayerProgress,
  method: VerificationMethod,
  data: VerificationData,
) -> ServerWsMessage {
  let limit = state.config.session.verify_timeout();
  match session.verify_challenge_within(method, &data, limit).await {
    Ok(verified) => {
      if verified {
        if let Some(card) = session.current_card() {
          *progress = update_user_progress(progress.clone(), card, method, session.social_trigger_activated());
        }
      }
      ServerWsMessage::Verification { verified, session: session.snapshot(), progress: progress.clone() }
    }
    Err(e) => error_reply(session, e.to_string()),
  }
}

/// Apply one client message to this connection's session and player.
#[instrument(level = "info", skip(state, session, progress, dealt), fields(player = %session.player_id()))]
pub async fn handle_session_command(
  state: &AppState,
  session: &mut ChallengeSession,
  progress: &mut PlayerProgress,
  dealt: &mut DealtCards,
  msg: ClientWsMessage,
) -> ServerWsMessage {
  let snapshot = |session: &ChallengeSession, progress: &PlayerProgress| ServerWsMessage::Session {
    session: session.snapshot(),
    progress: progress.clone(),
  };

  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::DrawCard { params } => {
      let card = do_generate_card(state, &params);
      dealt.deal(card.clone());
      ServerWsMessage::Card { card }
    }

    ClientWsMessage::StartChallenge { card_id } => {
      let card = card_id.as_deref().and_then(|id| dealt.take(id));
      if card.is_none() {
        warn!(target: "session", card_id = card_id.as_deref().unwrap_or("-"), "Start refused: card was not dealt to this player");
      }
      match session.start_challenge(card) {
        Ok(()) => snapshot(session, progress),
        Err(e) => error_reply(session, e.to_string()),
      }
    }

    ClientWsMessage::CompleteChallenge => match session.complete_challenge() {
      Ok(()) => snapshot(session, progress),
      Err(e) => error_reply(session, e.to_string()),
    },

    ClientWsMessage::VerifyChallenge { method, data } => verify_and_progress(state, session, progress, method, data).await,

    ClientWsMessage::SubmitPhoto { data } => {
      verify_and_progress(state, session, progress, VerificationMethod::Photo, VerificationData::content(data)).await
    }

    ClientWsMessage::SubmitAudio { data } => {
      verify_and_progress(state, session, progress, VerificationMethod::Audio, VerificationData::content(data)).await
    }

    ClientWsMessage::SubmitGroupVerification { votes, threshold } => {
      verify_and_progress(state, session, progress, VerificationMethod::Group, VerificationData::votes(votes, threshold)).await
    }

    ClientWsMessage::ClaimReward => match session.claim_reward() {
      Ok(reward) => ServerWsMessage::Reward { reward: reward_out(state, reward), session: session.snapshot() },
      Err(e) => error_reply(session, e.to_string()),
    },

    ClientWsMessage::RedeemReward { reward_id } => match session.redeem_reward(&reward_id) {
      Ok(reward) => ServerWsMessage::Reward { reward: reward_out(state, reward), session: session.snapshot() },
      Err(e) => error_reply(session, e.to_string()),
    },

    ClientWsMessage::ResetChallenge => {
      session.reset_challenge();
      snapshot(session, progress)
    }

    ClientWsMessage::ClearError => {
      session.clear_error();
      snapshot(session, progress)
    }

    ClientWsMessage::GetState => snapshot(session, progress),
  }
}
