//! Pool store and profile source contracts, plus the in-memory engines.
//!
//! The scheduler only needs four pool operations: a full per-user read,
//! a batch insert with server-assigned ids, an atomic usage update, and a
//! full delete (reset). Filtering and sorting are client-side concerns.
//! `MemoryPool` is the reference engine backing this binary; anything that
//! satisfies `PoolStore` (a document store, a SQL table) can replace it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Category, DifficultyScores, PromptItem, SkillScores};
use crate::error::StoreError;

/// A prompt about to be persisted. Usage metadata starts zeroed.
#[derive(Clone, Debug)]
pub struct NewPrompt {
    pub text: String,
    pub category: Category,
    pub difficulty: f64,
    pub scores: DifficultyScores,
}

#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Full read of one user's pool.
    async fn list(&self, uid: &str) -> Result<Vec<PromptItem>, StoreError>;

    /// Persist a batch of new prompts (all-or-nothing). Ids are assigned by
    /// the store. Returns the number inserted.
    async fn insert_batch(&self, uid: &str, items: Vec<NewPrompt>) -> Result<usize, StoreError>;

    /// For each id: `times_used += 1`, `last_used_at = now`. Unknown ids are
    /// skipped; the update is atomic per item.
    async fn mark_served(
        &self,
        uid: &str,
        ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Scoring collaborator's write path: overwrite `last_score` (0..=1).
    async fn record_score(&self, uid: &str, id: &str, score: f64) -> Result<(), StoreError>;

    /// Delete the user's entire pool. Returns the number removed.
    async fn delete_all(&self, uid: &str) -> Result<usize, StoreError>;
}

/// Read-only per-user profile data the scheduler consumes.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Per-category skill scalars; unset categories default to 50.
    async fn skills(&self, uid: &str) -> SkillScores;

    /// Free-text onboarding context. Absence is not an error.
    async fn context(&self, uid: &str) -> Option<String>;
}

/// In-memory pool keyed by uid.
#[derive(Default)]
pub struct MemoryPool {
    pools: RwLock<HashMap<String, Vec<PromptItem>>>,
}

impl MemoryPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl PoolStore for MemoryPool {
    async fn list(&self, uid: &str) -> Result<Vec<PromptItem>, StoreError> {
        let pools = self.pools.read().await;
        Ok(pools.get(uid).cloned().unwrap_or_default())
    }

    async fn insert_batch(&self, uid: &str, items: Vec<NewPrompt>) -> Result<usize, StoreError> {
        let mut pools = self.pools.write().await;
        let pool = pools.entry(uid.to_string()).or_default();
        let n = items.len();
        let now = Utc::now();
        for item in items {
            pool.push(PromptItem {
                id: Uuid::new_v4().to_string(),
                text: item.text,
                category: item.category,
                difficulty: item.difficulty,
                scores: item.scores,
                times_used: 0,
                last_used_at: None,
                last_score: None,
                owner_uid: uid.to_string(),
                created_at: now,
                source: "api-cached".to_string(),
            });
        }
        Ok(n)
    }

    async fn mark_served(
        &self,
        uid: &str,
        ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut pools = self.pools.write().await;
        if let Some(pool) = pools.get_mut(uid) {
            for item in pool.iter_mut() {
                if ids.iter().any(|id| *id == item.id) {
                    item.times_used += 1;
                    item.last_used_at = Some(now);
                }
            }
        }
        debug!(target: "scheduler", %uid, count = ids.len(), "Usage metadata updated");
        Ok(())
    }

    async fn record_score(&self, uid: &str, id: &str, score: f64) -> Result<(), StoreError> {
        let mut pools = self.pools.write().await;
        let item = pools
            .get_mut(uid)
            .and_then(|pool| pool.iter_mut().find(|p| p.id == id))
            .ok_or_else(|| StoreError::Write(format!("unknown prompt id {id}")))?;
        item.last_score = Some(score.clamp(0.0, 1.0));
        Ok(())
    }

    async fn delete_all(&self, uid: &str) -> Result<usize, StoreError> {
        let mut pools = self.pools.write().await;
        Ok(pools.remove(uid).map(|p| p.len()).unwrap_or(0))
    }
}

/// In-memory profile data (skills + onboarding context).
#[derive(Default)]
pub struct MemoryProfiles {
    skills: RwLock<HashMap<String, SkillScores>>,
    contexts: RwLock<HashMap<String, String>>,
}

impl MemoryProfiles {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set_skills(&self, uid: &str, skills: SkillScores) {
        self.skills.write().await.insert(uid.to_string(), skills);
    }

    pub async fn set_context(&self, uid: &str, context: impl Into<String>) {
        self.contexts.write().await.insert(uid.to_string(), context.into());
    }
}

#[async_trait]
impl ProfileSource for MemoryProfiles {
    async fn skills(&self, uid: &str) -> SkillScores {
        self.skills.read().await.get(uid).cloned().unwrap_or_default()
    }

    async fn context(&self, uid: &str) -> Option<String> {
        self.contexts.read().await.get(uid).cloned()
    }
}
