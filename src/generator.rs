//! Content generator: turns a target category/difficulty band into persisted
//! pool items.
//!
//! Generation is side-effecting only. Callers learn how many items landed,
//! never the items themselves; concurrent readers pick them up from the pool
//! on their next read. Malformed candidates and duplicates are dropped with a
//! log line, not a failure.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::GenPrompts;
use crate::difficulty::estimate;
use crate::domain::Category;
use crate::error::GenerateError;
use crate::openai::{GenerationRequest, ModelClient};
use crate::store::{NewPrompt, PoolStore, ProfileSource};
use crate::util::normalize;

pub struct PromptGenerator {
  model: Arc<dyn ModelClient>,
  store: Arc<dyn PoolStore>,
  profiles: Arc<dyn ProfileSource>,
  prompts: GenPrompts,
}

impl PromptGenerator {
  pub fn new(
    model: Arc<dyn ModelClient>,
    store: Arc<dyn PoolStore>,
    profiles: Arc<dyn ProfileSource>,
    prompts: GenPrompts,
  ) -> Self {
    Self { model, store, profiles, prompts }
  }

  /// Generate up to `batch` new prompts around `target_difficulty` and
  /// persist the survivors. Returns the number of items saved.
  #[instrument(level = "info", skip(self), fields(%uid, %category, target_difficulty, batch))]
  pub async fn generate(
    &self,
    uid: &str,
    category: Category,
    target_difficulty: f64,
    window: f64,
    batch: usize,
  ) -> Result<usize, GenerateError> {
    // Missing onboarding context degrades to an empty-context instruction.
    let context = self.profiles.context(uid).await;

    let req = GenerationRequest {
      category,
      batch,
      d_low: (target_difficulty - window).clamp(0.0, 100.0),
      d_high: (target_difficulty + window).clamp(0.0, 100.0),
      context,
    };

    let candidates = self.model.generate_prompts(&self.prompts, &req).await?;

    let existing = self.store.list(uid).await?;
    let mut seen: HashSet<String> = existing.iter().map(|p| normalize(&p.text)).collect();

    let mut fresh: Vec<NewPrompt> = Vec::new();
    for c in candidates {
      let text = c.text.trim();
      if text.is_empty() {
        warn!(target: "generator", %uid, "Dropping candidate with empty text");
        continue;
      }
      let Some(cat) = Category::parse(&c.category) else {
        warn!(target: "generator", %uid, category = %c.category, "Dropping candidate with unknown category");
        continue;
      };
      let key = normalize(text);
      if key.is_empty() || !seen.insert(key) {
        debug!(target: "generator", %uid, text, "Skipping duplicate candidate");
        continue;
      }
      let est = estimate(text, cat);
      fresh.push(NewPrompt {
        text: text.to_string(),
        category: cat,
        difficulty: est.difficulty,
        scores: est.scores,
      });
    }

    if fresh.is_empty() {
      info!(target: "generator", %uid, %category, "Generation yielded no new prompts");
      return Ok(0);
    }

    let saved = self.store.insert_batch(uid, fresh).await?;
    info!(target: "generator", %uid, %category, saved, "New prompts added to pool");
    Ok(saved)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use crate::error::ModelError;
  use crate::openai::testing::{candidate, ScriptedModel};
  use crate::store::{MemoryPool, MemoryProfiles};

  fn generator_with(model: Arc<ScriptedModel>, store: Arc<MemoryPool>) -> PromptGenerator {
    PromptGenerator::new(model, store, MemoryProfiles::new(), GenPrompts::default())
  }

  #[tokio::test]
  async fn dedup_skips_candidates_already_in_pool() {
    let store = MemoryPool::new();
    let est = estimate("Name a pet.", Category::GenericVocab);
    store
      .insert_batch("u1", vec![NewPrompt {
        text: "Name a pet.".into(),
        category: Category::GenericVocab,
        difficulty: est.difficulty,
        scores: est.scores,
      }])
      .await
      .unwrap();

    let model = ScriptedModel::new(vec![Ok(vec![
      candidate("name a PET!", "genericVocab"),
      candidate("Name a fruit.", "genericVocab"),
    ])]);
    let saved = generator_with(model, store.clone())
      .generate("u1", Category::GenericVocab, 50.0, 8.0, 12)
      .await
      .unwrap();

    assert_eq!(saved, 1);
    let pool = store.list("u1").await.unwrap();
    assert_eq!(pool.len(), 2);
    assert!(pool.iter().any(|p| p.text == "Name a fruit."));
  }

  #[tokio::test]
  async fn dedup_applies_within_one_batch() {
    let store = MemoryPool::new();
    let model = ScriptedModel::new(vec![Ok(vec![
      candidate("Name a tool.", "genericVocab"),
      candidate("Name a tool!", "genericVocab"),
    ])]);
    let saved = generator_with(model, store.clone())
      .generate("u1", Category::GenericVocab, 50.0, 8.0, 12)
      .await
      .unwrap();
    assert_eq!(saved, 1);
  }

  #[tokio::test]
  async fn malformed_candidates_dropped_without_failing_batch() {
    let store = MemoryPool::new();
    let model = ScriptedModel::new(vec![Ok(vec![
      candidate("", "genericVocab"),
      candidate("Name a bird.", "vocabulary"),
      candidate("Name a bird.", "genericVocab"),
    ])]);
    let saved = generator_with(model, store.clone())
      .generate("u1", Category::GenericVocab, 50.0, 8.0, 12)
      .await
      .unwrap();
    assert_eq!(saved, 1);
    let pool = store.list("u1").await.unwrap();
    assert_eq!(pool[0].category, Category::GenericVocab);
  }

  #[tokio::test]
  async fn band_is_clamped_into_valid_range() {
    let store = MemoryPool::new();
    let model = ScriptedModel::new(vec![Ok(vec![])]);
    generator_with(model.clone(), store)
      .generate("u1", Category::GenericVocab, 3.0, 8.0, 6)
      .await
      .unwrap();
    let reqs = model.requests.lock().unwrap();
    assert_eq!(reqs[0].d_low, 0.0);
    assert_eq!(reqs[0].d_high, 11.0);
  }

  #[tokio::test]
  async fn onboarding_context_is_forwarded_when_present() {
    let store = MemoryPool::new();
    let profiles = MemoryProfiles::new();
    profiles.set_context("u1", "Retired gardener, two grandkids.").await;
    let model = ScriptedModel::new(vec![Ok(vec![]), Ok(vec![])]);
    let gen = PromptGenerator::new(
      model.clone(),
      store,
      profiles,
      GenPrompts::default(),
    );

    gen.generate("u1", Category::PersonalVocab, 50.0, 8.0, 6).await.unwrap();
    gen.generate("u2", Category::PersonalVocab, 50.0, 8.0, 6).await.unwrap();

    let reqs = model.requests.lock().unwrap();
    assert_eq!(reqs[0].context.as_deref(), Some("Retired gardener, two grandkids."));
    // Absent context degrades to none, not an error.
    assert_eq!(reqs[1].context, None);
  }

  #[tokio::test]
  async fn model_failure_propagates_as_generate_error() {
    let store = MemoryPool::new();
    let model = ScriptedModel::new(vec![Err(ModelError::Disabled)]);
    let err = generator_with(model, store)
      .generate("u1", Category::GenericVocab, 50.0, 8.0, 12)
      .await
      .unwrap_err();
    assert!(matches!(err, GenerateError::Model(_)));
  }
}
