//! Per-player challenge session: a small state machine driving a card from
//! start through verification to reward.
//!
//! ```text
//! idle --start--> in_progress --complete--> verifying --verify--> completed --claim--> idle
//!                      ^                                    \---> failed --complete--^ (retry)
//! any --reset--> idle
//! ```
//!
//! Guarded operations never leave the machine in an undefined state: a failed
//! precondition records `last_error` and returns the error without a transition.
//! The session is owned by exactly one caller; it does no internal locking.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::SessionCfg;
use crate::domain::{
  Card, ChallengeStatus, EmotionalTier, Reward, RewardKind, VerificationData, VerificationMethod,
};
use crate::error::{SessionError, StoreError};
use crate::ledger::RewardLedger;
use crate::store::{KeyValueStore, PlayerState};
use crate::util::{payload_len, trunc_for_log};
use crate::verifier::Verifier;

const INTENSITY_CAP: u8 = 100;
const SOCIAL_BONUS_MULTIPLIER: f64 = 1.5;
const SOCIAL_BONUS_SUFFIX: &str = " + Social Bonus";

/// Read-only view of a session, for transport.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
  pub player_id: String,
  pub status: ChallengeStatus,
  pub current_card: Option<Card>,
  pub verification_method: VerificationMethod,
  pub emotional_intensity: u8,
  pub social_trigger_activated: bool,
  pub last_error: Option<String>,
  pub rewards: Vec<Reward>,
}

/// Outcome decided before the settling interval elapses.
enum Pending {
  Decided(bool),
  Classify(String),
}

pub struct ChallengeSession {
  player_id: String,
  current_card: Option<Card>,
  status: ChallengeStatus,
  verification_method: VerificationMethod,
  emotional_intensity: u8,
  social_trigger_activated: bool,
  last_error: Option<String>,
  ledger: RewardLedger,
  settings: SessionCfg,
  rng: StdRng,
  store: Arc<dyn KeyValueStore>,
  verifier: Arc<dyn Verifier>,
}

/// Intensity gained by a verified challenge: 5, plus 5 (intense) or 10
/// (chaotic), plus 5 when the social trigger fired.
pub fn session_intensity_gain(tier: Option<EmotionalTier>, social_triggered: bool) -> u8 {
  let tier_bonus = match tier {
    Some(EmotionalTier::Intense) => 5,
    Some(EmotionalTier::Chaotic) => 10,
    _ => 0,
  };
  5 + tier_bonus + if social_triggered { 5 } else { 0 }
}

impl ChallengeSession {
  /// Build a session for one player, loading the persisted ledger and
  /// intensity. Load failures start from empty state and are reported via
  /// `last_error`.
  #[instrument(level = "info", skip(settings, store, verifier, rng))]
  pub fn open(
    player_id: &str,
    settings: SessionCfg,
    store: Arc<dyn KeyValueStore>,
    verifier: Arc<dyn Verifier>,
    rng: StdRng,
  ) -> Self {
    let mut last_error = None;
    let (rewards, intensity) = {
      let state = PlayerState::new(store.as_ref(), player_id);
      let rewards = state.load_rewards().unwrap_or_else(|e| {
        warn!(target: "session", player = %player_id, error = %e, "Could not load reward ledger");
        last_error = Some(format!("Could not load saved rewards: {e}"));
        Vec::new()
      });
      let intensity = state.load_intensity().unwrap_or_else(|e| {
        warn!(target: "session", player = %player_id, error = %e, "Could not load emotional intensity");
        last_error = Some(format!("Could not load saved intensity: {e}"));
        0
      });
      (rewards, intensity)
    };
    info!(target: "session", player = %player_id, rewards = rewards.len(), intensity, "Session opened");

    Self {
      player_id: player_id.to_string(),
      current_card: None,
      status: ChallengeStatus::Idle,
      verification_method: VerificationMethod::SelfReport,
      emotional_intensity: intensity,
      social_trigger_activated: false,
      last_error,
      ledger: RewardLedger::from_rewards(rewards),
      settings,
      rng,
      store,
      verifier,
    }
  }

  pub fn player_id(&self) -> &str {
    &self.player_id
  }

  pub fn status(&self) -> ChallengeStatus {
    self.status
  }

  pub fn current_card(&self) -> Option<&Card> {
    self.current_card.as_ref()
  }

  pub fn verification_method(&self) -> VerificationMethod {
    self.verification_method
  }

  pub fn emotional_intensity(&self) -> u8 {
    self.emotional_intensity
  }

  pub fn social_trigger_activated(&self) -> bool {
    self.social_trigger_activated
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn ledger(&self) -> &RewardLedger {
    &self.ledger
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    SessionSnapshot {
      player_id: self.player_id.clone(),
      status: self.status,
      current_card: self.current_card.clone(),
      verification_method: self.verification_method,
      emotional_intensity: self.emotional_intensity,
      social_trigger_activated: self.social_trigger_activated,
      last_error: self.last_error.clone(),
      rewards: self.ledger.rewards().to_vec(),
    }
  }

  fn fail<T>(&mut self, err: SessionError) -> Result<T, SessionError> {
    warn!(target: "session", player = %self.player_id, status = %self.status, error = %err, "Session operation refused");
    self.last_error = Some(err.to_string());
    Err(err)
  }

  fn note_persistence_error(&mut self, err: StoreError) {
    let err = SessionError::Persistence(err.to_string());
    warn!(target: "session", player = %self.player_id, error = %err, "Persistence failed; keeping in-memory state");
    self.last_error = Some(err.to_string());
  }

  /// idle/any -> in_progress. The verification method follows the card's tier:
  /// chaotic is group-voted, intense needs a photo or audio clip, the rest is self-reported.
  #[instrument(level = "info", skip(self, card), fields(player = %self.player_id, card_id = card.as_ref().map(|c| c.card_id.as_str()).unwrap_or("-")))]
  pub fn start_challenge(&mut self, card: Option<Card>) -> Result<(), SessionError> {
    let Some(card) = card else {
      return self.fail(SessionError::MissingCard);
    };

    self.verification_method = match card.emotional_tier {
      Some(EmotionalTier::Chaotic) => VerificationMethod::Group,
      Some(EmotionalTier::Intense) => [VerificationMethod::Photo, VerificationMethod::Audio]
        .choose(&mut self.rng)
        .copied()
        .unwrap_or(VerificationMethod::Photo),
      _ => VerificationMethod::SelfReport,
    };
    info!(target: "session", card_id = %card.card_id, method = %self.verification_method, "Challenge started");
    self.current_card = Some(card);
    self.social_trigger_activated = false;
    self.status = ChallengeStatus::InProgress;
    Ok(())
  }

  /// in_progress (or failed, for a retry) -> verifying.
  #[instrument(level = "info", skip(self), fields(player = %self.player_id))]
  pub fn complete_challenge(&mut self) -> Result<(), SessionError> {
    if self.current_card.is_none() {
      return self.fail(SessionError::NoActiveCard);
    }
    match self.status {
      ChallengeStatus::InProgress | ChallengeStatus::Failed => {
        self.status = ChallengeStatus::Verifying;
        info!(target: "session", method = %self.verification_method, "Awaiting verification");
        Ok(())
      }
      other => self.fail(SessionError::WrongStatus(other, ChallengeStatus::InProgress)),
    }
  }

  /// Check preconditions without touching state (apart from `last_error` on refusal).
  fn prepare_verification(&self, method: VerificationMethod, data: &VerificationData) -> Result<Pending, SessionError> {
    if self.current_card.is_none() {
      return Err(SessionError::NoActiveCard);
    }
    if self.status != ChallengeStatus::Verifying {
      return Err(SessionError::WrongStatus(self.status, ChallengeStatus::Verifying));
    }
    match method {
      VerificationMethod::SelfReport => Ok(Pending::Decided(true)),
      VerificationMethod::Group => match (data.votes, data.threshold) {
        (Some(votes), Some(threshold)) => Ok(Pending::Decided(votes >= threshold)),
        _ => Err(SessionError::IncompleteVotes),
      },
      VerificationMethod::Ai => Ok(Pending::Classify(data.content.clone().unwrap_or_default())),
      VerificationMethod::Photo | VerificationMethod::Audio => match data.content.as_deref() {
        Some(content) if payload_len(content) > 0 => Ok(Pending::Classify(content.to_string())),
        _ => Err(SessionError::MissingPayload(method)),
      },
      VerificationMethod::Text | VerificationMethod::Unknown => Ok(Pending::Decided(true)),
    }
  }

  /// verifying -> completed | failed.
  ///
  /// Suspends for the settling interval (and the classifier, for photo/audio/ai)
  /// before resolving. All state changes happen after the last suspension
  /// point, so dropping this future leaves the session untouched.
  #[instrument(level = "info", skip(self, method, data), fields(player = %self.player_id, %method))]
  pub async fn verify_challenge(&mut self, method: VerificationMethod, data: &VerificationData) -> Result<bool, SessionError> {
    let pending = match self.prepare_verification(method, data) {
      Ok(p) => p,
      Err(e) => return self.fail(e),
    };

    tokio::time::sleep(self.settings.settle_interval()).await;

    let verified = match pending {
      Pending::Decided(v) => v,
      Pending::Classify(payload) => {
        info!(target: "session", payload = %trunc_for_log(&payload, 48), "Sending payload to classifier");
        match self.verifier.classify(method, &payload).await {
          Ok(verdict) => verdict.verified,
          Err(e) => return self.fail(SessionError::VerifierUnavailable(e.to_string())),
        }
      }
    };

    Ok(self.resolve_verification(method, verified))
  }

  /// Like `verify_challenge`, but gives up after `limit`. A timed-out
  /// verification leaves the session exactly as it was (still verifying).
  pub async fn verify_challenge_within(
    &mut self,
    method: VerificationMethod,
    data: &VerificationData,
    limit: Duration,
  ) -> Result<bool, SessionError> {
    let outcome = tokio::time::timeout(limit, self.verify_challenge(method, data)).await;
    match outcome {
      Ok(result) => result,
      Err(_) => self.fail(SessionError::VerificationTimedOut(limit.as_millis())),
    }
  }

  fn resolve_verification(&mut self, method: VerificationMethod, verified: bool) -> bool {
    let rate = if self.settings.social_trigger_rate.is_nan() { 0.0 } else { self.settings.social_trigger_rate.clamp(0.0, 1.0) };
    self.social_trigger_activated = self.rng.gen_bool(rate);
    self.verification_method = method;

    if verified {
      let tier = self.current_card.as_ref().and_then(|c| c.emotional_tier);
      let gain = session_intensity_gain(tier, self.social_trigger_activated);
      self.emotional_intensity = self.emotional_intensity.saturating_add(gain).min(INTENSITY_CAP);
      self.status = ChallengeStatus::Completed;
      if let Err(e) = PlayerState::new(self.store.as_ref(), &self.player_id).save_intensity(self.emotional_intensity) {
        self.note_persistence_error(e);
      }
    } else {
      self.status = ChallengeStatus::Failed;
    }

    info!(
      target: "session",
      player = %self.player_id,
      %method,
      verified,
      social = self.social_trigger_activated,
      intensity = self.emotional_intensity,
      status = %self.status,
      "Verification resolved"
    );
    verified
  }

  pub async fn submit_photo(&mut self, data: &str) -> Result<bool, SessionError> {
    self.verify_challenge(VerificationMethod::Photo, &VerificationData::content(data)).await
  }

  pub async fn submit_audio(&mut self, data: &str) -> Result<bool, SessionError> {
    self.verify_challenge(VerificationMethod::Audio, &VerificationData::content(data)).await
  }

  pub async fn submit_group_verification(&mut self, votes: u32, threshold: u32) -> Result<bool, SessionError> {
    self.verify_challenge(VerificationMethod::Group, &VerificationData::votes(votes, threshold)).await
  }

  /// completed -> idle, issuing a reward into the ledger.
  #[instrument(level = "info", skip(self), fields(player = %self.player_id))]
  pub fn claim_reward(&mut self) -> Result<Reward, SessionError> {
    if self.status != ChallengeStatus::Completed {
      return self.fail(SessionError::WrongStatus(self.status, ChallengeStatus::Completed));
    }
    let Some(card) = self.current_card.as_ref() else {
      return self.fail(SessionError::NoActiveCard);
    };

    let (name, value) = if self.social_trigger_activated {
      (format!("{}{}", card.title, SOCIAL_BONUS_SUFFIX), card.reward_value * SOCIAL_BONUS_MULTIPLIER)
    } else {
      (card.title.clone(), card.reward_value)
    };
    let reward = Reward {
      id: Uuid::new_v4().to_string(),
      name,
      description: card.reward.clone(),
      kind: RewardKind::from(card.reward_type),
      value,
      brand_id: card.brand_sponsor.as_ref().map(|s| s.id.clone()),
      card_id: card.card_id.clone(),
      expires_at: Utc::now() + chrono::Duration::days(self.settings.reward_ttl_days),
      redeemed: false,
    };

    self.ledger.issue(reward.clone());
    info!(target: "session", reward_id = %reward.id, value = reward.value, kind = ?reward.kind, "Reward issued");
    if let Err(e) = PlayerState::new(self.store.as_ref(), &self.player_id).save_rewards(self.ledger.rewards()) {
      self.note_persistence_error(e);
    }
    self.reset_challenge();
    Ok(reward)
  }

  /// Mark an issued reward as redeemed.
  #[instrument(level = "info", skip(self), fields(player = %self.player_id))]
  pub fn redeem_reward(&mut self, reward_id: &str) -> Result<Reward, SessionError> {
    let redeemed = match self.ledger.redeem(reward_id, Utc::now()).cloned() {
      Ok(r) => r,
      Err(e) => return self.fail(e),
    };
    if let Err(e) = PlayerState::new(self.store.as_ref(), &self.player_id).save_rewards(self.ledger.rewards()) {
      self.note_persistence_error(e);
    }
    info!(target: "session", %reward_id, "Reward redeemed");
    Ok(redeemed)
  }

  /// any -> idle. Clears the card and the social trigger; intensity and the ledger stay.
  pub fn reset_challenge(&mut self) {
    self.current_card = None;
    self.social_trigger_activated = false;
    self.status = ChallengeStatus::Idle;
    info!(target: "session", player = %self.player_id, "Challenge reset");
  }

  /// Clears the error message only; the state machine is untouched.
  pub fn clear_error(&mut self) {
    self.last_error = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use rand::SeedableRng;

  use crate::catalog::Catalog;
  use crate::domain::{ChallengeType, GenerationParameters};
  use crate::error::VerifyError;
  use crate::generator::generate_card;
  use crate::store::MemoryStore;
  use crate::verifier::{StubVerifier, Verdict};

  fn settings(social_rate: f64) -> SessionCfg {
    SessionCfg { settle_ms: 0, social_trigger_rate: social_rate, ..SessionCfg::default() }
  }

  fn session_with(verifier: StubVerifier, social_rate: f64, store: Arc<dyn KeyValueStore>) -> ChallengeSession {
    ChallengeSession::open("p1", settings(social_rate), store, Arc::new(verifier), StdRng::seed_from_u64(5))
  }

  fn session() -> ChallengeSession {
    session_with(StubVerifier::always(true), 0.0, Arc::new(MemoryStore::default()))
  }

  fn card(tier: Option<EmotionalTier>) -> Card {
    let params = GenerationParameters {
      emotional_tier: tier,
      challenge_type: Some(ChallengeType::Individual),
      ..Default::default()
    };
    generate_card(&Catalog::default(), &params, &mut StdRng::seed_from_u64(9))
  }

  async fn ready(session: &mut ChallengeSession, tier: Option<EmotionalTier>) {
    session.start_challenge(Some(card(tier))).unwrap();
    session.complete_challenge().unwrap();
    assert_eq!(session.status(), ChallengeStatus::Verifying);
  }

  #[test]
  fn start_without_card_fails_and_stays_idle() {
    let mut s = session();
    assert_eq!(s.start_challenge(None), Err(SessionError::MissingCard));
    assert_eq!(s.status(), ChallengeStatus::Idle);
    assert_eq!(s.last_error(), Some("No challenge card provided"));
  }

  #[test]
  fn start_derives_method_from_tier() {
    let mut s = session();
    s.start_challenge(Some(card(Some(EmotionalTier::Chaotic)))).unwrap();
    assert_eq!(s.verification_method(), VerificationMethod::Group);
    s.start_challenge(Some(card(Some(EmotionalTier::Mild)))).unwrap();
    assert_eq!(s.verification_method(), VerificationMethod::SelfReport);
    s.start_challenge(Some(card(None))).unwrap();
    assert_eq!(s.verification_method(), VerificationMethod::SelfReport);
    for _ in 0..10 {
      s.start_challenge(Some(card(Some(EmotionalTier::Intense)))).unwrap();
      assert!(matches!(s.verification_method(), VerificationMethod::Photo | VerificationMethod::Audio));
    }
    assert_eq!(s.status(), ChallengeStatus::InProgress);
  }

  #[test]
  fn complete_requires_active_card() {
    let mut s = session();
    assert_eq!(s.complete_challenge(), Err(SessionError::NoActiveCard));
    assert_eq!(s.status(), ChallengeStatus::Idle);
  }

  #[tokio::test]
  async fn self_report_always_completes() {
    let mut s = session_with(StubVerifier::always(false), 0.0, Arc::new(MemoryStore::default()));
    ready(&mut s, Some(EmotionalTier::Mild)).await;
    assert_eq!(s.verify_challenge(VerificationMethod::SelfReport, &VerificationData::default()).await, Ok(true));
    assert_eq!(s.status(), ChallengeStatus::Completed);
  }

  #[tokio::test]
  async fn group_votes_against_threshold() {
    let mut s = session();
    ready(&mut s, Some(EmotionalTier::Chaotic)).await;
    assert_eq!(s.submit_group_verification(3, 3).await, Ok(true));
    assert_eq!(s.status(), ChallengeStatus::Completed);

    let mut s = session();
    ready(&mut s, Some(EmotionalTier::Chaotic)).await;
    assert_eq!(s.submit_group_verification(2, 3).await, Ok(false));
    assert_eq!(s.status(), ChallengeStatus::Failed);
  }

  #[tokio::test]
  async fn incomplete_group_data_does_not_transition() {
    let mut s = session();
    ready(&mut s, Some(EmotionalTier::Chaotic)).await;
    let data = VerificationData { votes: Some(4), ..Default::default() };
    assert_eq!(s.verify_challenge(VerificationMethod::Group, &data).await, Err(SessionError::IncompleteVotes));
    assert_eq!(s.status(), ChallengeStatus::Verifying);
    assert!(s.last_error().is_some());
  }

  #[tokio::test]
  async fn photo_needs_payload_then_classifier_decides() {
    let mut s = session_with(StubVerifier::always(false), 0.0, Arc::new(MemoryStore::default()));
    ready(&mut s, Some(EmotionalTier::Intense)).await;
    assert_eq!(s.submit_photo("  ").await, Err(SessionError::MissingPayload(VerificationMethod::Photo)));
    assert_eq!(s.status(), ChallengeStatus::Verifying);

    assert_eq!(s.submit_photo("data:image/jpeg;base64,/9j/4AAQ").await, Ok(false));
    assert_eq!(s.status(), ChallengeStatus::Failed);

    // Failed challenges can go back through verification.
    s.complete_challenge().unwrap();
    assert_eq!(s.verify_challenge(VerificationMethod::SelfReport, &VerificationData::default()).await, Ok(true));
  }

  #[tokio::test]
  async fn audio_and_ai_go_through_the_classifier() {
    let mut s = session();
    ready(&mut s, Some(EmotionalTier::Intense)).await;
    assert_eq!(s.submit_audio("UklGRiQAAABXQVZF").await, Ok(true));

    let mut s = session_with(StubVerifier::always(false), 0.0, Arc::new(MemoryStore::default()));
    ready(&mut s, None).await;
    assert_eq!(s.verify_challenge(VerificationMethod::Ai, &VerificationData::default()).await, Ok(false));
  }

  #[tokio::test]
  async fn unknown_method_is_lenient() {
    let mut s = session_with(StubVerifier::always(false), 0.0, Arc::new(MemoryStore::default()));
    ready(&mut s, None).await;
    assert_eq!(s.verify_challenge(VerificationMethod::Unknown, &VerificationData::default()).await, Ok(true));
  }

  #[tokio::test]
  async fn verify_before_complete_is_refused() {
    let mut s = session();
    s.start_challenge(Some(card(None))).unwrap();
    let r = s.verify_challenge(VerificationMethod::SelfReport, &VerificationData::default()).await;
    assert_eq!(r, Err(SessionError::WrongStatus(ChallengeStatus::InProgress, ChallengeStatus::Verifying)));
    assert_eq!(s.status(), ChallengeStatus::InProgress);
  }

  #[tokio::test]
  async fn chaotic_success_with_social_trigger_adds_twenty() {
    let mut s = session_with(StubVerifier::always(true), 1.0, Arc::new(MemoryStore::default()));
    ready(&mut s, Some(EmotionalTier::Chaotic)).await;
    s.submit_group_verification(5, 3).await.unwrap();
    assert!(s.social_trigger_activated());
    assert_eq!(s.emotional_intensity(), 20);
  }

  #[tokio::test]
  async fn intensity_is_capped_and_persisted() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
    PlayerState::new(store.as_ref(), "p1").save_intensity(95).unwrap();
    let mut s = session_with(StubVerifier::always(true), 1.0, store.clone());
    assert_eq!(s.emotional_intensity(), 95);
    ready(&mut s, Some(EmotionalTier::Chaotic)).await;
    s.submit_group_verification(3, 3).await.unwrap();
    assert_eq!(s.emotional_intensity(), 100);
    assert_eq!(PlayerState::new(store.as_ref(), "p1").load_intensity().unwrap(), 100);
  }

  #[tokio::test]
  async fn claim_requires_completion_and_leaves_ledger_alone() {
    let mut s = session();
    assert!(s.claim_reward().is_err());
    ready(&mut s, Some(EmotionalTier::Mild)).await;
    assert_eq!(
      s.claim_reward(),
      Err(SessionError::WrongStatus(ChallengeStatus::Verifying, ChallengeStatus::Completed))
    );
    assert!(s.ledger().is_empty());
    assert_eq!(s.status(), ChallengeStatus::Verifying);
  }

  #[tokio::test]
  async fn claim_with_social_bonus_multiplies_and_resets() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
    let mut s = session_with(StubVerifier::always(true), 1.0, store.clone());
    ready(&mut s, Some(EmotionalTier::Mild)).await;
    let card = s.current_card().cloned().unwrap();
    s.verify_challenge(VerificationMethod::SelfReport, &VerificationData::default()).await.unwrap();

    let reward = s.claim_reward().unwrap();
    assert_eq!(reward.value, card.reward_value * 1.5);
    assert!(reward.name.ends_with(SOCIAL_BONUS_SUFFIX));
    assert_eq!(reward.kind, RewardKind::Physical);
    assert_eq!(reward.card_id, card.card_id);
    assert!(!reward.redeemed);

    assert_eq!(s.status(), ChallengeStatus::Idle);
    assert!(s.current_card().is_none());
    assert!(!s.social_trigger_activated());
    assert_eq!(s.ledger().len(), 1);

    // A new session for the same player sees the persisted ledger.
    let reopened = session_with(StubVerifier::always(true), 0.0, store);
    assert_eq!(reopened.ledger().rewards()[0].id, reward.id);
  }

  #[tokio::test]
  async fn claim_without_social_keeps_base_value() {
    let mut s = session();
    ready(&mut s, Some(EmotionalTier::Chaotic)).await;
    let card = s.current_card().cloned().unwrap();
    s.submit_group_verification(1, 1).await.unwrap();
    let reward = s.claim_reward().unwrap();
    assert_eq!(reward.value, card.reward_value);
    assert_eq!(reward.name, card.title);
  }

  #[tokio::test]
  async fn redeem_flips_flag_once() {
    let mut s = session();
    ready(&mut s, Some(EmotionalTier::Mild)).await;
    s.verify_challenge(VerificationMethod::SelfReport, &VerificationData::default()).await.unwrap();
    let reward = s.claim_reward().unwrap();
    assert!(s.redeem_reward(&reward.id).unwrap().redeemed);
    assert_eq!(s.redeem_reward(&reward.id), Err(SessionError::AlreadyRedeemed(reward.id.clone())));
    assert!(s.ledger().rewards()[0].redeemed);
  }

  #[tokio::test]
  async fn reset_from_any_state() {
    let mut s = session();
    s.reset_challenge();
    assert_eq!(s.status(), ChallengeStatus::Idle);

    s.start_challenge(Some(card(None))).unwrap();
    s.reset_challenge();
    assert_eq!(s.status(), ChallengeStatus::Idle);
    assert!(s.current_card().is_none());

    ready(&mut s, None).await;
    s.reset_challenge();
    assert_eq!(s.status(), ChallengeStatus::Idle);

    ready(&mut s, None).await;
    s.verify_challenge(VerificationMethod::SelfReport, &VerificationData::default()).await.unwrap();
    s.reset_challenge();
    assert_eq!(s.status(), ChallengeStatus::Idle);
    assert!(s.current_card().is_none());
    assert!(s.ledger().is_empty());

    let mut s = session_with(StubVerifier::always(false), 1.0, Arc::new(MemoryStore::default()));
    ready(&mut s, Some(EmotionalTier::Intense)).await;
    assert_eq!(s.submit_photo("aGVsbG8=").await, Ok(false));
    assert_eq!(s.status(), ChallengeStatus::Failed);
    s.reset_challenge();
    assert_eq!(s.status(), ChallengeStatus::Idle);
    assert!(s.current_card().is_none());
    assert!(!s.social_trigger_activated());
  }

  #[tokio::test]
  async fn each_verification_redraws_the_social_trigger() {
    let mut s = session_with(StubVerifier::always(false), 1.0, Arc::new(MemoryStore::default()));
    ready(&mut s, Some(EmotionalTier::Intense)).await;
    assert_eq!(s.submit_audio("UklGRiQAAABXQVZF").await, Ok(false));
    assert!(s.social_trigger_activated());

    s.settings.social_trigger_rate = 0.0;
    s.complete_challenge().unwrap();
    assert!(s.social_trigger_activated());
    assert_eq!(s.verify_challenge(VerificationMethod::SelfReport, &VerificationData::default()).await, Ok(true));
    assert!(!s.social_trigger_activated());
    assert_eq!(s.emotional_intensity(), session_intensity_gain(Some(EmotionalTier::Intense), false));
  }

  #[test]
  fn clear_error_only_clears_message() {
    let mut s = session();
    s.start_challenge(Some(card(None))).unwrap();
    let _ = s.claim_reward();
    assert!(s.last_error().is_some());
    s.clear_error();
    assert!(s.last_error().is_none());
    assert_eq!(s.status(), ChallengeStatus::InProgress);
  }

  struct NeverAnswers;

  #[async_trait]
  impl Verifier for NeverAnswers {
    async fn classify(&self, _method: VerificationMethod, _payload: &str) -> Result<Verdict, VerifyError> {
      std::future::pending().await
    }
  }

  #[tokio::test]
  async fn timed_out_verification_leaves_state_untouched() {
    let mut s = ChallengeSession::open(
      "p1",
      settings(1.0),
      Arc::new(MemoryStore::default()),
      Arc::new(NeverAnswers),
      StdRng::seed_from_u64(1),
    );
    ready(&mut s, Some(EmotionalTier::Intense)).await;
    let r = s.verify_challenge_within(VerificationMethod::Photo, &VerificationData::content("aGVsbG8="), Duration::from_millis(20)).await;
    assert_eq!(r, Err(SessionError::VerificationTimedOut(20)));
    assert_eq!(s.status(), ChallengeStatus::Verifying);
    assert!(!s.social_trigger_activated());
    assert_eq!(s.emotional_intensity(), 0);
  }

  struct BrokenStore;

  impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
      Ok(None)
    }
    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
      Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
    }
  }

  #[tokio::test]
  async fn persistence_failure_is_reported_but_state_advances() {
    let mut s = session_with(StubVerifier::always(true), 0.0, Arc::new(BrokenStore));
    ready(&mut s, Some(EmotionalTier::Mild)).await;
    assert_eq!(s.verify_challenge(VerificationMethod::SelfReport, &VerificationData::default()).await, Ok(true));
    assert_eq!(s.status(), ChallengeStatus::Completed);
    assert_eq!(s.emotional_intensity(), 5);
    assert!(s.last_error().unwrap().starts_with("Could not save progress"));
    assert!(s.claim_reward().is_ok());
    assert_eq!(s.ledger().len(), 1);
  }
}
