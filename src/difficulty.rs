//! Heuristic difficulty estimator (V1: proxy features, bounded weights).
//!
//! Pure and deterministic: the same text and category always produce the same
//! score, with no I/O. The weights were tuned so realistic prompts span the
//! 0-85 range; scores are clamped there and never recomputed after creation.

use crate::domain::{Category, DifficultyScores};

const MAX_DIFFICULTY: f64 = 85.0;

pub struct Estimate {
  pub difficulty: f64,
  pub scores: DifficultyScores,
}

/// Score a prompt's difficulty from its text and category.
pub fn estimate(text: &str, category: Category) -> Estimate {
  let words: Vec<&str> = text.split_whitespace().collect();
  let longest = words.iter().map(|w| w.chars().count()).max().unwrap_or(0);

  // Word-frequency proxy (1=common, 5=rare): longest word length, bucketed.
  let freq_norm: u8 = match longest {
    0..=4 => 1,
    5..=6 => 2,
    7..=8 => 3,
    9..=10 => 4,
    _ => 5,
  };

  // Abstractness (1=concrete, 5=abstract).
  let abstractness: u8 = match category {
    Category::Open => 4,
    Category::Challenge => 3,
    _ if longest > 8 => 3,
    _ => 2,
  };

  // Whole-prompt word count, bucketed.
  let length_scale: u8 = match words.len() {
    0..=3 => 1,
    4..=6 => 2,
    7..=9 => 3,
    10..=12 => 4,
    _ => 5,
  };

  let response_type_scale: u8 = match category {
    Category::Open => 3,
    Category::PersonalVocab => 2,
    _ => 1,
  };

  let semantic_distance_scale: u8 = match category {
    Category::PersonalVocab | Category::Open => 1,
    Category::GenericVocab => 2,
    Category::Challenge => 3,
  };

  let raw = 8.0 * f64::from(5 - freq_norm)
    + 5.0 * f64::from(abstractness)
    + 4.0 * f64::from(length_scale)
    + 6.0 * f64::from(response_type_scale)
    + 8.0 * f64::from(semantic_distance_scale);

  Estimate {
    difficulty: raw.clamp(0.0, MAX_DIFFICULTY),
    scores: DifficultyScores {
      freq_norm,
      abstractness,
      length_scale,
      response_type_scale,
      semantic_distance_scale,
    },
  }
}
