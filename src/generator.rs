//! Card generation: compose a `Card` from catalog fragments keyed by the
//! generation axes.
//!
//! Flow:
//! 1) Title = base title (prompt type) + modifier (mood).
//! 2) Challenge text = base text (prompt type), wrapped for duet/group play.
//! 3) Backup narrative (voice), social trigger (challenge type), reward
//!    bracket (emotional tier, branded when a sponsor is requested),
//!    companion song (genre).
//! 4) Verification method: explicit override, else decided by challenge type.
//!
//! All randomness comes from the caller's `Rng`, so a seeded source gives
//! reproducible cards (apart from the timestamp half of the id).

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, instrument};

use crate::catalog::{self, Catalog};
use crate::domain::{
  Card, ChallengeType, EmotionalTier, FinalVoice, GenerationParameters, GenreTag, MoodComposer, PromptType,
  VerificationMethod,
};
use crate::util::{fill_template, random_suffix};

const CARD_ID_SUFFIX_LEN: usize = 9;

/// Rotation applied to decks that don't pin a challenge type.
const DECK_TYPE_CYCLE: [ChallengeType; 3] = [ChallengeType::Individual, ChallengeType::Duet, ChallengeType::Group];

/// Timestamp plus random suffix. Unique in practice, not cryptographically.
pub fn new_card_id<R: Rng + ?Sized>(rng: &mut R) -> String {
  format!("card_{}_{}", Utc::now().timestamp_millis(), random_suffix(rng, CARD_ID_SUFFIX_LEN))
}

/// Override wins; otherwise group cards are group-voted, duets need a photo,
/// and individual cards draw uniformly from the individual choices.
pub fn resolve_verification_method<R: Rng + ?Sized>(
  challenge_type: ChallengeType,
  explicit: Option<VerificationMethod>,
  rng: &mut R,
) -> VerificationMethod {
  if let Some(m) = explicit {
    return m;
  }
  match challenge_type {
    ChallengeType::Group => VerificationMethod::Group,
    ChallengeType::Duet => VerificationMethod::Photo,
    ChallengeType::Individual => VerificationMethod::INDIVIDUAL_CHOICES
      .choose(rng)
      .copied()
      .unwrap_or(VerificationMethod::SelfReport),
  }
}

fn wrap_challenge(kind: ChallengeType, base: &str, partner: &str) -> String {
  match catalog::challenge_wrapper(kind) {
    Some(tpl) => fill_template(tpl, &[("challenge", base), ("partner", partner)]),
    None => base.to_string(),
  }
}

/// Build one card. Total: every unset axis has a fallback.
#[instrument(level = "debug", skip(catalog, rng), fields(prompt = ?params.prompt_type, kind = ?params.challenge_type, tier = ?params.emotional_tier))]
pub fn generate_card<R: Rng + ?Sized>(catalog: &Catalog, params: &GenerationParameters, rng: &mut R) -> Card {
  let challenge_type = params.challenge_type.unwrap_or(ChallengeType::Individual);
  let partner = params
    .partner_selection
    .as_deref()
    .filter(|p| !p.trim().is_empty())
    .unwrap_or(catalog::DEFAULT_PARTNER);

  let title = format!(
    "{}: {}",
    catalog::base_title(params.prompt_type),
    catalog::mood_modifier(params.mood_composer)
  );
  let challenge = wrap_challenge(challenge_type, catalog::base_challenge(params.prompt_type), partner);
  let narrative_backup = catalog::narrative_backup(params.final_voice).to_string();
  let social_trigger = fill_template(catalog::social_trigger_template(challenge_type), &[("partner", partner)]);

  let (reward_text, mut reward_type, mut reward_value) = catalog::reward_bracket(params.emotional_tier);
  let mut reward = reward_text.to_string();
  let brand_sponsor = params.brand_id.as_deref().filter(|b| !b.trim().is_empty()).map(|brand_id| {
    let (sponsor, pinned_type) = catalog.sponsor(brand_id);
    reward.push_str(&format!(" (courtesy of {})", sponsor.name));
    reward_value = sponsor.reward_value;
    if let Some(t) = pinned_type {
      reward_type = t;
    }
    sponsor
  });

  let verification_method = resolve_verification_method(challenge_type, params.verification_method, rng);
  let genre = params.genre_tag.unwrap_or(catalog::DEFAULT_GENRE);
  let song = catalog::companion_song(params.genre_tag).to_string();

  let card = Card {
    card_id: new_card_id(rng),
    title,
    challenge,
    social_trigger,
    reward,
    reward_type,
    reward_value,
    emotional_tier: params.emotional_tier,
    challenge_type,
    genre,
    song,
    narrative_backup,
    verification_method,
    brand_sponsor,
  };
  debug!(target: "card", card_id = %card.card_id, method = %card.verification_method, reward_type = %card.reward_type, "Card generated");
  card
}

fn pick<T: Copy, R: Rng + ?Sized>(fixed: Option<T>, all: &[T], rng: &mut R) -> Option<T> {
  fixed.or_else(|| all.choose(rng).copied())
}

/// Build `count` cards. Axes set in `partial` hold for the whole deck; an unset
/// challenge type cycles individual/duet/group; other unset axes are drawn
/// independently per card.
#[instrument(level = "info", skip(catalog, count, partial, rng), fields(%count))]
pub fn generate_card_deck<R: Rng + ?Sized>(
  catalog: &Catalog,
  count: usize,
  partial: &GenerationParameters,
  rng: &mut R,
) -> Vec<Card> {
  let mut deck = Vec::with_capacity(count);
  for i in 0..count {
    let params = GenerationParameters {
      prompt_type: pick(partial.prompt_type, PromptType::ALL, rng),
      mood_composer: pick(partial.mood_composer, MoodComposer::ALL, rng),
      final_voice: pick(partial.final_voice, FinalVoice::ALL, rng),
      challenge_type: Some(partial.challenge_type.unwrap_or(DECK_TYPE_CYCLE[i % DECK_TYPE_CYCLE.len()])),
      emotional_tier: pick(partial.emotional_tier, EmotionalTier::ALL, rng),
      genre_tag: pick(partial.genre_tag, GenreTag::ALL, rng),
      verification_method: partial.verification_method,
      partner_selection: partial.partner_selection.clone(),
      brand_id: partial.brand_id.clone(),
    };
    deck.push(generate_card(catalog, &params, rng));
  }
  deck
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  use crate::domain::CardRewardType;

  fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
  }

  #[test]
  fn default_params_produce_complete_card() {
    let card = generate_card(&Catalog::default(), &GenerationParameters::default(), &mut rng());
    for field in [&card.card_id, &card.title, &card.challenge, &card.social_trigger, &card.reward, &card.song, &card.narrative_backup] {
      assert!(!field.trim().is_empty());
    }
    assert_eq!(card.challenge_type, ChallengeType::Individual);
    assert!(card.emotional_tier.is_none());
    assert_eq!(card.reward_type, CardRewardType::Discount, "unset tier falls back to the intense bracket");
    assert!(card.brand_sponsor.is_none());
  }

  #[test]
  fn every_axis_combination_fills_required_fields() {
    let catalog = Catalog::default();
    let mut r = rng();
    for &prompt in PromptType::ALL {
      for &mood in MoodComposer::ALL {
        for &kind in ChallengeType::ALL {
          for &tier in EmotionalTier::ALL {
            let params = GenerationParameters {
              prompt_type: Some(prompt),
              mood_composer: Some(mood),
              challenge_type: Some(kind),
              emotional_tier: Some(tier),
              ..Default::default()
            };
            let card = generate_card(&catalog, &params, &mut r);
            assert!(card.title.contains(catalog::base_title(Some(prompt))));
            assert!(card.title.contains(catalog::mood_modifier(Some(mood))));
            assert!(card.challenge.contains(catalog::base_challenge(Some(prompt))));
            assert!(!card.social_trigger.contains('{'), "unfilled template: {}", card.social_trigger);
            assert_eq!(card.emotional_tier, Some(tier));
          }
        }
      }
    }
  }

  #[test]
  fn card_ids_are_unique_over_ten_thousand_calls() {
    let catalog = Catalog::default();
    let mut r = rng();
    let params = GenerationParameters::default();
    let ids: HashSet<String> = (0..10_000).map(|_| generate_card(&catalog, &params, &mut r).card_id).collect();
    assert_eq!(ids.len(), 10_000);
  }

  #[test]
  fn challenge_type_decides_default_verification() {
    let catalog = Catalog::default();
    let mut r = rng();
    for _ in 0..50 {
      let group = GenerationParameters { challenge_type: Some(ChallengeType::Group), ..Default::default() };
      assert_eq!(generate_card(&catalog, &group, &mut r).verification_method, VerificationMethod::Group);

      let duet = GenerationParameters { challenge_type: Some(ChallengeType::Duet), ..Default::default() };
      assert_eq!(generate_card(&catalog, &duet, &mut r).verification_method, VerificationMethod::Photo);

      let solo = GenerationParameters { challenge_type: Some(ChallengeType::Individual), ..Default::default() };
      let m = generate_card(&catalog, &solo, &mut r).verification_method;
      assert!(VerificationMethod::INDIVIDUAL_CHOICES.contains(&m));
    }
  }

  #[test]
  fn explicit_verification_override_wins() {
    let params = GenerationParameters {
      challenge_type: Some(ChallengeType::Group),
      verification_method: Some(VerificationMethod::Audio),
      ..Default::default()
    };
    let card = generate_card(&Catalog::default(), &params, &mut rng());
    assert_eq!(card.verification_method, VerificationMethod::Audio);
  }

  #[test]
  fn duet_and_group_wrap_the_challenge() {
    let catalog = Catalog::default();
    let mut r = rng();
    let base = catalog::base_challenge(Some(PromptType::Dare));

    let duet = GenerationParameters {
      prompt_type: Some(PromptType::Dare),
      challenge_type: Some(ChallengeType::Duet),
      partner_selection: Some("Sam".into()),
      ..Default::default()
    };
    let card = generate_card(&catalog, &duet, &mut r);
    assert!(card.challenge.contains(base) && card.challenge.contains("Sam") && card.challenge.contains("take turns"));
    assert!(card.social_trigger.contains("Sam"));

    let group = GenerationParameters { prompt_type: Some(PromptType::Dare), challenge_type: Some(ChallengeType::Group), ..Default::default() };
    let card = generate_card(&catalog, &group, &mut r);
    assert!(card.challenge.contains(base) && card.challenge.starts_with("Whole table"));

    let solo = GenerationParameters { prompt_type: Some(PromptType::Dare), ..Default::default() };
    assert_eq!(generate_card(&catalog, &solo, &mut r).challenge, base);
  }

  #[test]
  fn brand_appends_suffix_and_sponsor() {
    let params = GenerationParameters {
      emotional_tier: Some(EmotionalTier::Mild),
      brand_id: Some("aurora".into()),
      ..Default::default()
    };
    let card = generate_card(&Catalog::default(), &params, &mut rng());
    assert!(card.reward.ends_with("(courtesy of Aurora Spirits)"));
    let sponsor = card.brand_sponsor.expect("sponsor");
    assert_eq!(sponsor.id, "aurora");
    assert_eq!(card.reward_value, sponsor.reward_value);
    assert_eq!(card.reward_type, CardRewardType::Shot);
  }

  #[test]
  fn sponsor_can_pin_product_reward() {
    let params = GenerationParameters { brand_id: Some("neonfizz".into()), ..Default::default() };
    let card = generate_card(&Catalog::default(), &params, &mut rng());
    assert_eq!(card.reward_type, CardRewardType::Product);
  }

  #[test]
  fn same_seed_same_content() {
    let catalog = Catalog::default();
    let params = GenerationParameters::default();
    let a = generate_card_deck(&catalog, 12, &params, &mut StdRng::seed_from_u64(99));
    let b = generate_card_deck(&catalog, 12, &params, &mut StdRng::seed_from_u64(99));
    for (x, y) in a.iter().zip(&b) {
      assert_eq!(x.title, y.title);
      assert_eq!(x.verification_method, y.verification_method);
      assert_eq!(x.card_id.rsplit('_').next(), y.card_id.rsplit('_').next());
    }
  }

  #[test]
  fn deck_cycles_unset_challenge_type_and_holds_fixed_axes() {
    let partial = GenerationParameters {
      emotional_tier: Some(EmotionalTier::Chaotic),
      genre_tag: Some(GenreTag::Rock),
      ..Default::default()
    };
    let deck = generate_card_deck(&Catalog::default(), 9, &partial, &mut rng());
    assert_eq!(deck.len(), 9);
    for (i, card) in deck.iter().enumerate() {
      assert_eq!(card.challenge_type, DECK_TYPE_CYCLE[i % 3]);
      assert_eq!(card.emotional_tier, Some(EmotionalTier::Chaotic));
      assert_eq!(card.genre, GenreTag::Rock);
    }
  }

  #[test]
  fn deck_randomizes_unset_axes() {
    let partial = GenerationParameters { challenge_type: Some(ChallengeType::Duet), ..Default::default() };
    let deck = generate_card_deck(&Catalog::default(), 60, &partial, &mut rng());
    assert!(deck.iter().all(|c| c.challenge_type == ChallengeType::Duet));
    let titles: HashSet<&str> = deck.iter().map(|c| c.title.as_str()).collect();
    let tiers: HashSet<_> = deck.iter().map(|c| c.emotional_tier).collect();
    assert!(titles.len() > 1);
    assert!(tiers.len() > 1);
  }
}
