//! Request-time prompt selection: eligibility filter, rotation ranking,
//! difficulty bucketing, replenishment, and the mark-served side effect.
//!
//! Every call is a self-contained read/select/write cycle against the pool
//! store; no state lives in the process between calls. Two concurrent calls
//! for the same user can both pick the same least-used item before either
//! usage write lands. Re-serving a practice prompt once in a while is cheap,
//! so there is deliberately no reservation or locking here.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, instrument, warn};

use crate::config::Tuning;
use crate::domain::{Category, PromptItem};
use crate::error::SchedulerError;
use crate::generator::PromptGenerator;
use crate::store::{PoolStore, ProfileSource};

/// One selection result: the main batch plus easy/hard overflow tiers.
#[derive(Debug, Default)]
pub struct Batch {
  pub main: Vec<PromptItem>,
  pub easy_backups: Vec<PromptItem>,
  pub hard_backups: Vec<PromptItem>,
}

impl Batch {
  fn is_fully_stocked(&self, t: &Tuning) -> bool {
    self.main.len() >= t.batch_size
      && self.easy_backups.len() >= t.backup_cap
      && self.hard_backups.len() >= t.backup_cap
  }

  /// Ids across all three tiers. Each item appears in at most one tier.
  pub fn served_ids(&self) -> Vec<String> {
    self
      .main
      .iter()
      .chain(&self.easy_backups)
      .chain(&self.hard_backups)
      .map(|p| p.id.clone())
      .collect()
  }
}

pub struct PromptScheduler {
  store: Arc<dyn PoolStore>,
  generator: Arc<PromptGenerator>,
  profiles: Arc<dyn ProfileSource>,
  tuning: Tuning,
}

impl PromptScheduler {
  pub fn new(
    store: Arc<dyn PoolStore>,
    generator: Arc<PromptGenerator>,
    profiles: Arc<dyn ProfileSource>,
    tuning: Tuning,
  ) -> Self {
    Self { store, generator, profiles, tuning }
  }

  /// Select the next batch for a user and mark every returned item served.
  /// `batch_size` overrides the configured main-batch size when given.
  ///
  /// The mark-served write is issued fire-and-forget: the response does not
  /// wait for it, and its failure is only logged.
  #[instrument(level = "info", skip(self), fields(%uid, %category))]
  pub async fn select_batch(
    &self,
    uid: &str,
    category: Category,
    batch_size: Option<usize>,
  ) -> Result<Batch, SchedulerError> {
    let t = Tuning {
      batch_size: batch_size.unwrap_or(self.tuning.batch_size),
      ..self.tuning
    };
    let now = Utc::now();
    let cutoff = now - Duration::days(t.recent_days);
    let skill = self.profiles.skills(uid).await.skill_for(category);

    let pool = self.store.list(uid).await.map_err(SchedulerError::PoolRead)?;
    let picked = select_candidates(&pool, skill, &t, cutoff);
    let mut batch = bucket_strict(&picked, skill, &t);
    info!(
      target: "scheduler",
      %uid, skill,
      main = batch.main.len(),
      easy = batch.easy_backups.len(),
      hard = batch.hard_backups.len(),
      "Cache selection complete"
    );

    if !batch.is_fully_stocked(&t) {
      info!(target: "scheduler", %uid, "Pool short on one or more tiers; generating fresh prompts");
      self.replenish(uid, category, skill, &t).await;

      let pool = self.store.list(uid).await.map_err(SchedulerError::PoolRead)?;
      let picked = select_after_replenish(&pool, &t, cutoff);
      batch = bucket_permissive(&picked, skill, &t);

      if batch.main.is_empty() {
        error!(target: "scheduler", %uid, "No prompts available after regeneration");
        return Err(SchedulerError::NoContent);
      }
    }

    self.spawn_mark_served(uid, &batch);
    Ok(batch)
  }

  /// Delete the user's whole pool, then regenerate from scratch. Synchronous:
  /// returns only after regeneration finished, and fails if nothing landed.
  #[instrument(level = "info", skip(self), fields(%uid))]
  pub async fn reset_pool(&self, uid: &str) -> Result<usize, SchedulerError> {
    let removed = self.store.delete_all(uid).await.map_err(SchedulerError::PoolWrite)?;
    info!(target: "scheduler", %uid, removed, "Prompt pool cleared");
    self.seed_pool(uid).await
  }

  /// First-time pool seeding (end of onboarding). Fails if nothing landed.
  #[instrument(level = "info", skip(self), fields(%uid))]
  pub async fn initialize_pool(&self, uid: &str) -> Result<usize, SchedulerError> {
    self.seed_pool(uid).await
  }

  async fn seed_pool(&self, uid: &str) -> Result<usize, SchedulerError> {
    let saved = self
      .generate_logged(uid, Category::GenericVocab, 50.0, self.tuning.seed_batch)
      .await;
    if saved == 0 {
      return Err(SchedulerError::NoContent);
    }
    Ok(saved)
  }

  /// Three concurrent generation calls: the skill band for main, and the
  /// offset bands for easy/hard backups. A failed leg does not cancel the
  /// others; each failure just yields zero items.
  async fn replenish(&self, uid: &str, category: Category, skill: f64, t: &Tuning) {
    let (main_n, easy_n, hard_n) = tokio::join!(
      self.generate_logged(uid, category, skill, t.batch_size),
      self.generate_logged(uid, category, (skill - t.backup_gap).max(0.0), t.backup_gen_size),
      self.generate_logged(uid, category, (skill + t.backup_gap).min(100.0), t.backup_gen_size),
    );
    info!(target: "scheduler", %uid, main_n, easy_n, hard_n, "Replenishment finished");
  }

  async fn generate_logged(
    &self,
    uid: &str,
    category: Category,
    target_difficulty: f64,
    batch: usize,
  ) -> usize {
    match self
      .generator
      .generate(uid, category, target_difficulty, self.tuning.band, batch)
      .await
    {
      Ok(n) => n,
      Err(e) => {
        warn!(
          target: "scheduler",
          %uid, target_difficulty, error = %e,
          "Generation call failed; treating as zero yield"
        );
        0
      }
    }
  }

  fn spawn_mark_served(&self, uid: &str, batch: &Batch) {
    let ids = batch.served_ids();
    let store = Arc::clone(&self.store);
    let uid = uid.to_string();
    let now = Utc::now();
    tokio::spawn(async move {
      if let Err(e) = store.mark_served(&uid, &ids, now).await {
        error!(target: "scheduler", %uid, error = %e, "Mark-served write failed");
      }
    });
  }
}

fn is_recent(p: &PromptItem, cutoff: DateTime<Utc>) -> bool {
  p.last_used_at.map_or(false, |t| t > cutoff)
}

/// Stage-A eligibility: mastered-and-recent items are out, as is anything
/// served inside the recent window regardless of score.
fn is_eligible(p: &PromptItem, cutoff: DateTime<Utc>, mastered_threshold: f64) -> bool {
  let recent = is_recent(p, cutoff);
  if p.last_score.unwrap_or(0.0) >= mastered_threshold && recent {
    return false;
  }
  !recent
}

/// Stage-B ranking: least-used first; within equal usage, never-used items
/// before any timestamp, then oldest-used first. The sort is stable, so ties
/// keep insertion order.
fn rotation_order(items: &mut [PromptItem]) {
  items.sort_by(|a, b| {
    a.times_used.cmp(&b.times_used).then_with(|| match (a.last_used_at, b.last_used_at) {
      (None, None) => std::cmp::Ordering::Equal,
      (None, Some(_)) => std::cmp::Ordering::Less,
      (Some(_), None) => std::cmp::Ordering::Greater,
      (Some(x), Some(y)) => x.cmp(&y),
    })
  });
}

/// Stage-C progressive relaxation: an ordered list of predicates tried in
/// sequence, stopping at the first that yields a full batch. The final rung
/// (the whole pool) applies even when it still comes up short.
fn select_candidates(
  pool: &[PromptItem],
  skill: f64,
  t: &Tuning,
  cutoff: DateTime<Utc>,
) -> Vec<PromptItem> {
  let mastered = t.mastered_threshold;
  let band = t.band;
  let wide = t.band + 2.0;
  let rungs: [Box<dyn Fn(&PromptItem) -> bool>; 4] = [
    Box::new(move |p| is_eligible(p, cutoff, mastered) && (p.difficulty - skill).abs() <= band),
    Box::new(move |p| is_eligible(p, cutoff, mastered) && (p.difficulty - skill).abs() <= wide),
    Box::new(move |p| is_eligible(p, cutoff, mastered)),
    Box::new(|_| true),
  ];

  let mut picked: Vec<PromptItem> = Vec::new();
  for rung in &rungs {
    picked = pool.iter().filter(|p| rung(p)).cloned().collect();
    if picked.len() >= t.batch_size {
      break;
    }
  }
  rotation_order(&mut picked);
  picked
}

/// Post-generation relaxation: eligible first, then recency-only, then the
/// whole pool. The threshold is batch + one backup tier's worth.
fn select_after_replenish(pool: &[PromptItem], t: &Tuning, cutoff: DateTime<Utc>) -> Vec<PromptItem> {
  let mastered = t.mastered_threshold;
  let rungs: [Box<dyn Fn(&PromptItem) -> bool>; 3] = [
    Box::new(move |p| is_eligible(p, cutoff, mastered)),
    Box::new(move |p| !is_recent(p, cutoff)),
    Box::new(|_| true),
  ];
  let need = t.batch_size + t.backup_gen_size;

  let mut picked: Vec<PromptItem> = Vec::new();
  for rung in &rungs {
    picked = pool.iter().filter(|p| rung(p)).cloned().collect();
    if picked.len() >= need {
      break;
    }
  }
  rotation_order(&mut picked);
  picked
}

/// Stage-D bucketing: one walk over the ranked list, splitting by half-band
/// distance from the user's skill, then backfilling main from leftover
/// backups (easy first).
fn bucket_strict(sorted: &[PromptItem], skill: f64, t: &Tuning) -> Batch {
  let half = t.band / 2.0;
  let mut batch = Batch::default();
  for p in sorted {
    let d = p.difficulty.clamp(0.0, 100.0);
    if d < skill - half {
      if batch.easy_backups.len() < t.backup_cap {
        batch.easy_backups.push(p.clone());
      }
    } else if d > skill + half {
      if batch.hard_backups.len() < t.backup_cap {
        batch.hard_backups.push(p.clone());
      }
    } else if batch.main.len() < t.batch_size {
      batch.main.push(p.clone());
    }
    if batch.main.len() == t.batch_size
      && batch.easy_backups.len() == t.backup_cap
      && batch.hard_backups.len() == t.backup_cap
    {
      break;
    }
  }
  while batch.main.len() < t.batch_size && !batch.easy_backups.is_empty() {
    batch.main.push(batch.easy_backups.remove(0));
  }
  while batch.main.len() < t.batch_size && !batch.hard_backups.is_empty() {
    batch.main.push(batch.hard_backups.remove(0));
  }
  batch
}

/// Post-generation bucketing: fill main first, then split the rest into
/// easy/hard by plain skill comparison, then top main up from anything not
/// yet placed in a tier.
fn bucket_permissive(sorted: &[PromptItem], skill: f64, t: &Tuning) -> Batch {
  let mut batch = Batch::default();
  for p in sorted {
    let d = p.difficulty.clamp(0.0, 100.0);
    if batch.main.len() < t.batch_size {
      batch.main.push(p.clone());
    } else if d < skill {
      if batch.easy_backups.len() < t.backup_cap {
        batch.easy_backups.push(p.clone());
      }
    } else if batch.hard_backups.len() < t.backup_cap {
      batch.hard_backups.push(p.clone());
    }
    if batch.main.len() == t.batch_size
      && batch.easy_backups.len() == t.backup_cap
      && batch.hard_backups.len() == t.backup_cap
    {
      break;
    }
  }
  if batch.main.len() < t.batch_size {
    for p in sorted {
      if batch.main.len() >= t.batch_size {
        break;
      }
      let placed = batch
        .main
        .iter()
        .chain(&batch.easy_backups)
        .chain(&batch.hard_backups)
        .any(|q| q.id == p.id);
      if !placed {
        batch.main.push(p.clone());
      }
    }
  }
  batch
}
