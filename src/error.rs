//! Error types. `SessionError` display strings double as the user-visible
//! `last_error` message on a session.

use crate::domain::{ChallengeStatus, VerificationMethod};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
  #[error("No challenge card provided")]
  MissingCard,

  #[error("No active challenge")]
  NoActiveCard,

  #[error("Challenge is {0}, expected {1}")]
  WrongStatus(ChallengeStatus, ChallengeStatus),

  #[error("Verification by {0} needs a non-empty submission")]
  MissingPayload(VerificationMethod),

  #[error("Group verification needs both votes and threshold")]
  IncompleteVotes,

  #[error("Verification timed out after {0} ms")]
  VerificationTimedOut(u128),

  #[error("Verification service unavailable: {0}")]
  VerifierUnavailable(String),

  #[error("Reward {0} not found")]
  RewardNotFound(String),

  #[error("Reward {0} was already redeemed")]
  AlreadyRedeemed(String),

  #[error("Reward {0} has expired")]
  RewardExpired(String),

  #[error("Could not save progress: {0}")]
  Persistence(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("store I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("store data is not valid JSON: {0}")]
  Serde(#[from] serde_json::Error),

  #[error("store lock poisoned")]
  Poisoned,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
  #[error("HTTP transport failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("remote returned HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("verifier state unavailable")]
  Unavailable,
}
