//! Append-only reward ledger with redemption tracking.

use chrono::{DateTime, Utc};

use crate::domain::Reward;
use crate::error::SessionError;

#[derive(Clone, Debug, Default)]
pub struct RewardLedger {
  rewards: Vec<Reward>,
}

impl RewardLedger {
  pub fn from_rewards(rewards: Vec<Reward>) -> Self {
    Self { rewards }
  }

  pub fn issue(&mut self, reward: Reward) {
    self.rewards.push(reward);
  }

  /// Flip the redeemed flag. Unknown, redeemed, or expired rewards are refused.
  pub fn redeem(&mut self, reward_id: &str, now: DateTime<Utc>) -> Result<&Reward, SessionError> {
    let reward = self
      .rewards
      .iter_mut()
      .find(|r| r.id == reward_id)
      .ok_or_else(|| SessionError::RewardNotFound(reward_id.to_string()))?;
    if reward.redeemed {
      return Err(SessionError::AlreadyRedeemed(reward_id.to_string()));
    }
    if reward.is_expired(now) {
      return Err(SessionError::RewardExpired(reward_id.to_string()));
    }
    reward.redeemed = true;
    Ok(reward)
  }

  pub fn rewards(&self) -> &[Reward] {
    &self.rewards
  }

  pub fn len(&self) -> usize {
    self.rewards.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rewards.is_empty()
  }

  /// Rewards still claimable at `now`.
  pub fn redeemable(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Reward> {
    self.rewards.iter().filter(move |r| !r.redeemed && !r.is_expired(now))
  }
}
