//! Domain models: generation axes, cards, rewards, and player progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declares a closed, string-backed axis enum with an `ALL` table and `as_str`.
macro_rules! axis {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum $name { $($variant),+ }

    impl $name {
      #[allow(dead_code)]
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      pub fn as_str(self) -> &'static str {
        match self { $($name::$variant => $text),+ }
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

axis!(
  /// Narrative frame of the card: what kind of thing the player is asked to do.
  PromptType {
    Confession => "confession",
    Dare => "dare",
    Memory => "memory",
    Performance => "performance",
    Connection => "connection",
  }
);

axis!(
  /// Mood that colours the title.
  MoodComposer {
    Playful => "playful",
    Nostalgic => "nostalgic",
    Rebellious => "rebellious",
    Tender => "tender",
    Electric => "electric",
  }
);

axis!(
  /// Voice of the backup narrative line.
  FinalVoice {
    Poet => "poet",
    Narrator => "narrator",
    Trickster => "trickster",
    Oracle => "oracle",
  }
);

axis!(
  /// Music genre used to pick the companion song.
  GenreTag {
    Pop => "pop",
    Reggaeton => "reggaeton",
    Rock => "rock",
    Electronic => "electronic",
    Ballad => "ballad",
  }
);

axis!(
  /// Who takes part in the challenge.
  ChallengeType {
    Individual => "individual",
    Duet => "duet",
    Group => "group",
  }
);

axis!(
  /// Three-point intensity classification driving reward value and verification strictness.
  EmotionalTier {
    Mild => "mild",
    Intense => "intense",
    Chaotic => "chaotic",
  }
);

axis!(
  /// What a card promises the player.
  CardRewardType {
    Shot => "shot",
    Discount => "discount",
    ZerosumCard => "zerosum_card",
    Product => "product",
  }
);

axis!(
  /// Lifecycle state of a challenge session.
  ChallengeStatus {
    Idle => "idle",
    InProgress => "in_progress",
    Verifying => "verifying",
    Completed => "completed",
    Failed => "failed",
  }
);

/// Mechanism used to confirm completion.
///
/// `Unknown` absorbs any method name a client sends that we don't recognise;
/// it is resolved leniently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
  #[serde(rename = "self")]
  SelfReport,
  Group,
  Photo,
  Audio,
  Text,
  Ai,
  #[serde(other)]
  Unknown,
}

impl VerificationMethod {
  /// Methods an individual card may land on when nothing else decides.
  pub const INDIVIDUAL_CHOICES: &'static [VerificationMethod] = &[
    VerificationMethod::Photo,
    VerificationMethod::Audio,
    VerificationMethod::Text,
    VerificationMethod::SelfReport,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      VerificationMethod::SelfReport => "self",
      VerificationMethod::Group => "group",
      VerificationMethod::Photo => "photo",
      VerificationMethod::Audio => "audio",
      VerificationMethod::Text => "text",
      VerificationMethod::Ai => "ai",
      VerificationMethod::Unknown => "unknown",
    }
  }
}

impl std::fmt::Display for VerificationMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Inputs to the card generator. Every axis is optional: `generate_card`
/// falls back to a fixed default, `generate_card_deck` randomizes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
  #[serde(default)] pub prompt_type: Option<PromptType>,
  #[serde(default)] pub mood_composer: Option<MoodComposer>,
  #[serde(default)] pub final_voice: Option<FinalVoice>,
  #[serde(default)] pub challenge_type: Option<ChallengeType>,
  #[serde(default)] pub emotional_tier: Option<EmotionalTier>,
  #[serde(default)] pub genre_tag: Option<GenreTag>,
  #[serde(default)] pub verification_method: Option<VerificationMethod>,
  #[serde(default)] pub partner_selection: Option<String>,
  #[serde(default)] pub brand_id: Option<String>,
}

/// Sponsor attached to a card when a brand id was requested.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrandSponsor {
  pub id: String,
  pub name: String,
  pub reward_value: f64,
}

/// A generated challenge payload. Immutable once generated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
  pub card_id: String,
  pub title: String,
  pub challenge: String,
  pub social_trigger: String,
  pub reward: String,
  pub reward_type: CardRewardType,
  pub reward_value: f64,
  /// `None` when the card was generated without a tier.
  pub emotional_tier: Option<EmotionalTier>,
  pub challenge_type: ChallengeType,
  pub genre: GenreTag,
  pub song: String,
  pub narrative_backup: String,
  pub verification_method: VerificationMethod,
  #[serde(default)] pub brand_sponsor: Option<BrandSponsor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
  Digital,
  Physical,
  Experience,
}

impl From<CardRewardType> for RewardKind {
  fn from(t: CardRewardType) -> Self {
    match t {
      CardRewardType::Shot | CardRewardType::Product => RewardKind::Physical,
      CardRewardType::Discount => RewardKind::Digital,
      CardRewardType::ZerosumCard => RewardKind::Experience,
    }
  }
}

/// Reward issued by `claim_reward`. Only `redeemed` changes after issue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reward {
  pub id: String,
  pub name: String,
  pub description: String,
  pub kind: RewardKind,
  pub value: f64,
  #[serde(default)] pub brand_id: Option<String>,
  pub card_id: String,
  pub expires_at: DateTime<Utc>,
  #[serde(default)] pub redeemed: bool,
}

impl Reward {
  /// Short string handed to the external code encoder to render a redeemable code.
  pub fn redemption_payload(&self) -> String {
    format!("zerosum://redeem/{}", self.id)
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

/// Player progression bracket. Ordered: later variants unlock more.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerTier {
  Basic,
  Intermediate,
  Advanced,
}

impl PlayerTier {
  pub const ALL: &'static [PlayerTier] = &[PlayerTier::Basic, PlayerTier::Intermediate, PlayerTier::Advanced];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgress {
  pub id: String,
  pub name: String,
  /// Distinct completed card ids, in completion order.
  pub completed_cards: Vec<String>,
  pub emotional_score: u8,
  pub tier: PlayerTier,
  /// Reward identifiers unlocked so far, deduplicated. Tier pools are flattened
  /// into one list; `tiers::tier_reward_pool` lists what each tier contributes.
  pub rewards: Vec<String>,
}

impl PlayerProgress {
  /// Fresh player at the basic tier, holding the basic reward pool.
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      completed_cards: Vec::new(),
      emotional_score: 0,
      tier: PlayerTier::Basic,
      rewards: crate::tiers::calculate_available_rewards(PlayerTier::Basic)
        .into_iter()
        .map(str::to_string)
        .collect(),
    }
  }
}

/// Loose verification payload as sent by clients; which fields matter depends on the method.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VerificationData {
  #[serde(default)] pub content: Option<String>,
  #[serde(default)] pub votes: Option<u32>,
  #[serde(default)] pub threshold: Option<u32>,
}

impl VerificationData {
  pub fn content(content: impl Into<String>) -> Self {
    Self { content: Some(content.into()), ..Self::default() }
  }

  pub fn votes(votes: u32, threshold: u32) -> Self {
    Self { votes: Some(votes), threshold: Some(threshold), ..Self::default() }
  }
}
