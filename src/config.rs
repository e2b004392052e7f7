//! Loading service configuration (generation prompt + scheduler tuning) from TOML.
//!
//! See `AppConfig`, `GenPrompts`, and `Tuning` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: GenPrompts,
  #[serde(default)]
  pub tuning: Tuning,
}

/// Instruction template sent to the generative model. The default mirrors the
/// production authoring rules; override it in TOML to tune tone/structure.
/// Placeholders: {batch} {category} {d_low} {d_high} {context}.
#[derive(Clone, Debug, Deserialize)]
pub struct GenPrompts {
  pub generation_system: String,
}

impl Default for GenPrompts {
  fn default() -> Self {
    Self {
      generation_system: "\
You are generating therapy prompts for aphasia rehab.
Return exactly {batch} JSON objects.

### Target specs
- category = \"{category}\"
- aim for difficulty between {d_low} and {d_high} on a 0-100 scale
  (see difficulty rubric below).

### User context
{context}

### Difficulty rubric (internal)
0-30 very easy - high-frequency, concrete, single-word answers
31-50 moderate - everyday but less common, single-word answers
51-70 hard - low-frequency or abstract but concrete enough to cue
71-85 very hard - rare words, two-word collocations allowed
86-100 expert - do NOT output; reserved for future

### Prompt format rules
1. One clear single-word answer unless category is \"open\".
2. Sentence <= 12 words.
3. No \"two-word phrase for...\" meta wording.
4. Friendly tone.

### Output JSON schema
{ \"prompt\":\"...\", \"category\":\"...\", \"answer\":\"...\" }

Return as: { \"prompts\":[ ...{batch} items... ] }
NO comments or markdown."
        .into(),
    }
  }
}

/// Scheduler tuning knobs. Defaults are the production values; every field is
/// optional in TOML.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Tuning {
  /// Main batch size served per request.
  pub batch_size: usize,
  /// Cap on each backup tier.
  pub backup_cap: usize,
  /// Recency window (days): items served inside it are not re-served.
  pub recent_days: i64,
  /// last_score at or above this marks an item as mastered.
  pub mastered_threshold: f64,
  /// Half-width of the difficulty band around the user's skill.
  pub band: f64,
  /// Distance from skill targeted by easy/hard backup generation.
  pub backup_gap: f64,
  /// Batch size for each backup-tier generation call.
  pub backup_gen_size: usize,
  /// Batch size for initial seeding and pool resets.
  pub seed_batch: usize,
}

impl Default for Tuning {
  fn default() -> Self {
    Self {
      batch_size: 12,
      backup_cap: 3,
      recent_days: 2,
      mastered_threshold: 0.85,
      band: 8.0,
      backup_gap: 15.0,
      backup_gen_size: 6,
      seed_batch: 20,
    }
  }
}

/// Attempt to load `AppConfig` from SCHEDULER_CONFIG_PATH. On any parsing/IO
/// error, returns None and the caller falls back to defaults.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("SCHEDULER_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "parley_backend", %path, "Loaded service config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "parley_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "parley_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tuning_fields_are_optional_in_toml() {
    let cfg: AppConfig = toml::from_str(
      "[tuning]\nbatch_size = 6\nrecent_days = 1\n",
    )
    .unwrap();
    assert_eq!(cfg.tuning.batch_size, 6);
    assert_eq!(cfg.tuning.recent_days, 1);
    assert_eq!(cfg.tuning.backup_cap, 3);
    assert_eq!(cfg.tuning.mastered_threshold, 0.85);
  }

  #[test]
  fn default_template_carries_all_placeholders() {
    let tpl = GenPrompts::default().generation_system;
    for key in ["{batch}", "{category}", "{d_low}", "{d_high}", "{context}"] {
      assert!(tpl.contains(key), "missing {key}");
    }
  }
}
