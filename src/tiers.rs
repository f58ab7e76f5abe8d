//! Player tier and reward-threshold rules. Pure functions; the only mutation
//! entrypoint is `update_user_progress`.

use tracing::info;

use crate::domain::{Card, EmotionalTier, PlayerProgress, PlayerTier, VerificationMethod};

const SCORE_CAP: u32 = 100;

const ADVANCED_MIN_CARDS: usize = 3;
const ADVANCED_MIN_SCORE: u8 = 70;
const INTERMEDIATE_MIN_CARDS: usize = 2;
const INTERMEDIATE_MIN_SCORE: u8 = 50;

/// Reward identifiers introduced at each tier (not cumulative).
pub fn tier_reward_pool(tier: PlayerTier) -> &'static [&'static str] {
  match tier {
    PlayerTier::Basic => &["welcome_shot", "starter_sticker_pack"],
    PlayerTier::Intermediate => &["discount_10", "priority_queue", "duet_playlist"],
    PlayerTier::Advanced => &["zerosum_card_exclusive", "vip_table", "backstage_experience"],
  }
}

pub fn calculate_user_tier(completed_count: usize, score: u8) -> PlayerTier {
  if completed_count >= ADVANCED_MIN_CARDS && score >= ADVANCED_MIN_SCORE {
    PlayerTier::Advanced
  } else if completed_count >= INTERMEDIATE_MIN_CARDS && score >= INTERMEDIATE_MIN_SCORE {
    PlayerTier::Intermediate
  } else {
    PlayerTier::Basic
  }
}

/// Union of the pools of every tier at or below `tier`.
pub fn calculate_available_rewards(tier: PlayerTier) -> Vec<&'static str> {
  PlayerTier::ALL
    .iter()
    .filter(|t| **t <= tier)
    .flat_map(|t| tier_reward_pool(*t).iter().copied())
    .collect()
}

/// Score gain for one resolved challenge: 5/10/15 by card tier, +5 for group
/// verification, +3 for photo, +5 when the social trigger fired.
pub fn calculate_intensity_increase(card: &Card, method: VerificationMethod, social_triggered: bool) -> u32 {
  let base = match card.emotional_tier {
    Some(EmotionalTier::Chaotic) => 15,
    Some(EmotionalTier::Intense) => 10,
    _ => 5,
  };
  let method_bonus = match method {
    VerificationMethod::Group => 5,
    VerificationMethod::Photo => 3,
    _ => 0,
  };
  base + method_bonus + if social_triggered { 5 } else { 0 }
}

/// Record a completed card and recompute score and tier. Reward identifiers
/// are merged only when the tier goes up.
pub fn update_user_progress(
  mut player: PlayerProgress,
  card: &Card,
  method: VerificationMethod,
  social_triggered: bool,
) -> PlayerProgress {
  if !player.completed_cards.iter().any(|id| id == &card.card_id) {
    player.completed_cards.push(card.card_id.clone());
  }

  let gain = calculate_intensity_increase(card, method, social_triggered);
  player.emotional_score = (u32::from(player.emotional_score) + gain).min(SCORE_CAP) as u8;

  let previous = player.tier;
  let next = calculate_user_tier(player.completed_cards.len(), player.emotional_score);
  if next > previous {
    for id in calculate_available_rewards(next) {
      if !player.rewards.iter().any(|r| r == id) {
        player.rewards.push(id.to_string());
      }
    }
    player.tier = next;
    info!(target: "session", player = %player.id, ?previous, ?next, "Player tier up");
  }
  player
}
