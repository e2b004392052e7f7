//! Domain models: prompt categories, difficulty breakdown, pool items, and skill scores.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Exercise category. Wire names match the product's JSON contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
  /// Open-ended prompts with no single expected answer.
  Open,
  /// Vocabulary drawn from the user's own life and interests.
  PersonalVocab,
  /// Everyday vocabulary shared across users.
  GenericVocab,
  /// Stretch prompts: rarer words, longer retrieval paths.
  Challenge,
}

impl Category {
  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Open => "open",
      Category::PersonalVocab => "personalVocab",
      Category::GenericVocab => "genericVocab",
      Category::Challenge => "challenge",
    }
  }

  /// Parse a wire-format category name. Returns None for anything unknown,
  /// which callers treat as a malformed candidate.
  pub fn parse(s: &str) -> Option<Category> {
    match s {
      "open" => Some(Category::Open),
      "personalVocab" => Some(Category::PersonalVocab),
      "genericVocab" => Some(Category::GenericVocab),
      "challenge" => Some(Category::Challenge),
      _ => None,
    }
  }
}

impl std::fmt::Display for Category {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Per-dimension difficulty sub-scores (each 1-5), kept for explainability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyScores {
  pub freq_norm: u8,
  pub abstractness: u8,
  pub length_scale: u8,
  pub response_type_scale: u8,
  pub semantic_distance_scale: u8,
}

/// One entry in a user's prompt pool.
///
/// `id`, `text`, `category`, `difficulty`, and the sub-scores are immutable
/// after creation. `times_used` and `last_used_at` change only through the
/// mark-served write; `last_score` only through the scoring collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptItem {
  pub id: String,
  pub text: String,
  pub category: Category,
  pub difficulty: f64,
  #[serde(flatten)]
  pub scores: DifficultyScores,
  pub times_used: u32,
  pub last_used_at: Option<DateTime<Utc>>,
  pub last_score: Option<f64>,
  pub owner_uid: String,
  pub created_at: DateTime<Utc>,
  pub source: String,
}

/// Per-category skill scalars in [0, 100]. Read-only input to the scheduler;
/// unset categories default to 50.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SkillScores(pub HashMap<Category, f64>);

impl SkillScores {
  pub fn skill_for(&self, category: Category) -> f64 {
    self.0.get(&category).copied().unwrap_or(50.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn category_wire_names_round_trip() {
    for c in [Category::Open, Category::PersonalVocab, Category::GenericVocab, Category::Challenge] {
      assert_eq!(Category::parse(c.as_str()), Some(c));
      let json = serde_json::to_string(&c).unwrap();
      assert_eq!(json, format!("\"{}\"", c.as_str()));
    }
    assert_eq!(Category::parse("vocabulary"), None);
  }

  #[test]
  fn skill_defaults_to_midpoint() {
    let mut scores = SkillScores::default();
    assert_eq!(scores.skill_for(Category::Challenge), 50.0);
    scores.0.insert(Category::Challenge, 62.0);
    assert_eq!(scores.skill_for(Category::Challenge), 62.0);
  }
}
