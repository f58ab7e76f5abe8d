//! Static content tables: text fragments keyed by generation axes, plus the
//! brand sponsor table (built-ins merged with config entries).

use std::collections::HashMap;

use crate::config::BrandCfg;
use crate::domain::{
  BrandSponsor, CardRewardType, ChallengeType, EmotionalTier, FinalVoice, GenreTag, MoodComposer, PromptType,
};

/// Sponsor value used when a brand id is requested that no table knows.
pub const DEFAULT_SPONSOR_VALUE: f64 = 10.0;

/// Partner wording used by duet cards when no partner was picked.
pub const DEFAULT_PARTNER: &str = "the person to your left";

pub fn base_title(prompt: Option<PromptType>) -> &'static str {
  match prompt {
    Some(PromptType::Confession) => "Truth Bomb",
    Some(PromptType::Dare) => "Double Dare",
    Some(PromptType::Memory) => "Rewind",
    Some(PromptType::Performance) => "Center Stage",
    Some(PromptType::Connection) => "Wavelength",
    None => "Wild Card",
  }
}

pub fn mood_modifier(mood: Option<MoodComposer>) -> &'static str {
  match mood {
    Some(MoodComposer::Playful) => "Party Mode",
    Some(MoodComposer::Nostalgic) => "Throwback Edition",
    Some(MoodComposer::Rebellious) => "No Rules",
    Some(MoodComposer::Tender) => "Soft Hours",
    Some(MoodComposer::Electric) => "Full Voltage",
    None => "Open Mic",
  }
}

pub fn base_challenge(prompt: Option<PromptType>) -> &'static str {
  match prompt {
    Some(PromptType::Confession) => "Confess the most embarrassing thing you did this year, no edits allowed.",
    Some(PromptType::Dare) => "Order the next round using only gestures and facial expressions.",
    Some(PromptType::Memory) => "Tell the story of the best night out you ever had in under a minute.",
    Some(PromptType::Performance) => "Sing the chorus of the song playing right now like it's the final of a talent show.",
    Some(PromptType::Connection) => "Tell someone at the table one thing they do that you secretly admire.",
    None => "Do something tonight you'd normally talk yourself out of, then tell the table about it.",
  }
}

/// Wraps the base challenge text for the number of participants.
/// `{partner}` in the duet template is filled by the generator.
pub fn challenge_wrapper(kind: ChallengeType) -> Option<&'static str> {
  match kind {
    ChallengeType::Individual => None,
    ChallengeType::Duet => Some("Team up with {partner} and take turns: {challenge} Each of you goes once, one after the other."),
    ChallengeType::Group => Some("Whole table, together: {challenge} Each player adds their own twist on top of the last one."),
  }
}

pub fn narrative_backup(voice: Option<FinalVoice>) -> &'static str {
  match voice {
    Some(FinalVoice::Poet) => "Some nights are written in ink, and some in spilled drinks. Tonight, write yours.",
    Some(FinalVoice::Narrator) => "And so the player rose from their seat, unaware the whole bar was about to watch.",
    Some(FinalVoice::Trickster) => "Rules are more like suggestions. Bend this one just enough to get away with it.",
    Some(FinalVoice::Oracle) => "The cards foresaw this moment. What you do next decides how tonight is remembered.",
    None => "No script, no safety net. Just you and the moment.",
  }
}

/// Social trigger line; `{partner}` is filled by the generator.
pub fn social_trigger_template(kind: ChallengeType) -> &'static str {
  match kind {
    ChallengeType::Individual => "If anyone at the table cheers you on, they owe you a toast.",
    ChallengeType::Duet => "If {partner} laughs first, you both unlock a bonus round.",
    ChallengeType::Group => "If the whole table joins in, everyone levels up together.",
  }
}

/// Reward bracket for a tier. An unset tier lands on the intense bracket.
pub fn reward_bracket(tier: Option<EmotionalTier>) -> (&'static str, CardRewardType, f64) {
  match tier {
    Some(EmotionalTier::Mild) => ("A celebratory shot on the house", CardRewardType::Shot, 10.0),
    Some(EmotionalTier::Chaotic) => ("A limited-edition ZeroSum card", CardRewardType::ZerosumCard, 35.0),
    Some(EmotionalTier::Intense) | None => ("15% off your next round", CardRewardType::Discount, 20.0),
  }
}

pub fn companion_song(genre: Option<GenreTag>) -> &'static str {
  match genre {
    Some(GenreTag::Pop) => "Dancing On My Own - Robyn",
    Some(GenreTag::Reggaeton) => "Gasolina - Daddy Yankee",
    Some(GenreTag::Rock) => "Mr. Brightside - The Killers",
    Some(GenreTag::Electronic) => "One More Time - Daft Punk",
    Some(GenreTag::Ballad) => "Someone Like You - Adele",
    None => "Don't Stop Me Now - Queen",
  }
}

/// Genre used on the card when none was requested.
pub const DEFAULT_GENRE: GenreTag = GenreTag::Pop;

/// A sponsor entry as the catalog stores it.
#[derive(Clone, Debug, PartialEq)]
pub struct SponsorEntry {
  pub name: String,
  pub reward_value: f64,
  pub reward_type: Option<CardRewardType>,
}

/// Built-in sponsors that guarantee branded cards work without config.
fn seed_sponsors() -> HashMap<String, SponsorEntry> {
  [
    ("zerosum", "ZeroSum", 25.0, None),
    ("aurora", "Aurora Spirits", 15.0, None),
    ("neonfizz", "Neon Fizz", 12.0, Some(CardRewardType::Product)),
  ]
  .into_iter()
  .map(|(id, name, value, reward_type)| {
    (id.to_string(), SponsorEntry { name: name.to_string(), reward_value: value, reward_type })
  })
  .collect()
}

/// Immutable content catalog. Built once at startup and shared read-only.
#[derive(Clone, Debug)]
pub struct Catalog {
  sponsors: HashMap<String, SponsorEntry>,
}

impl Default for Catalog {
  fn default() -> Self {
    Self { sponsors: seed_sponsors() }
  }
}

impl Catalog {
  /// Built-ins plus config brands; config entries win on id collisions.
  pub fn with_brands(brands: &[BrandCfg]) -> Self {
    let mut sponsors = seed_sponsors();
    for b in brands {
      sponsors.insert(
        b.id.clone(),
        SponsorEntry {
          name: b.name.clone(),
          reward_value: b.reward_value.unwrap_or(DEFAULT_SPONSOR_VALUE),
          reward_type: b.reward_type,
        },
      );
    }
    Self { sponsors }
  }

  pub fn sponsor_count(&self) -> usize {
    self.sponsors.len()
  }

  /// Resolve a brand id. Unknown ids still sponsor the card, under their own id.
  pub fn sponsor(&self, brand_id: &str) -> (BrandSponsor, Option<CardRewardType>) {
    match self.sponsors.get(brand_id) {
      Some(e) => (
        BrandSponsor { id: brand_id.to_string(), name: e.name.clone(), reward_value: e.reward_value },
        e.reward_type,
      ),
      None => (
        BrandSponsor { id: brand_id.to_string(), name: brand_id.to_string(), reward_value: DEFAULT_SPONSOR_VALUE },
        None,
      ),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unset_tier_uses_intense_bracket() {
    assert_eq!(reward_bracket(None), reward_bracket(Some(EmotionalTier::Intense)));
  }

  #[test]
  fn config_brand_overrides_builtin() {
    let cfg = vec![BrandCfg {
      id: "zerosum".into(),
      name: "ZeroSum Club".into(),
      reward_value: Some(40.0),
      reward_type: Some(CardRewardType::Product),
    }];
    let catalog = Catalog::with_brands(&cfg);
    let (sponsor, pinned) = catalog.sponsor("zerosum");
    assert_eq!(sponsor.name, "ZeroSum Club");
    assert_eq!(sponsor.reward_value, 40.0);
    assert_eq!(pinned, Some(CardRewardType::Product));
  }

  #[test]
  fn unknown_brand_is_sponsored_under_its_id() {
    let (sponsor, pinned) = Catalog::default().sponsor("mystery");
    assert_eq!(sponsor.name, "mystery");
    assert_eq!(sponsor.reward_value, DEFAULT_SPONSOR_VALUE);
    assert!(pinned.is_none());
  }
}
