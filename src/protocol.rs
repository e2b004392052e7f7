//! Public request/response DTOs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and clients independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Category, PromptItem};
use crate::scheduler::Batch;

/// Wire shape of one served prompt. Difficulty is clamped into 0-100 for
/// display regardless of the estimator's internal range.
#[derive(Debug, Serialize)]
pub struct PromptOut {
    pub id: String,
    pub text: String,
    pub category: Category,
    pub difficulty: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOut {
    pub main: Vec<PromptOut>,
    pub easy_backups: Vec<PromptOut>,
    pub hard_backups: Vec<PromptOut>,
}

pub fn to_out(p: &PromptItem) -> PromptOut {
    PromptOut {
        id: p.id.clone(),
        text: p.text.clone(),
        category: p.category,
        difficulty: p.difficulty.clamp(0.0, 100.0),
    }
}

pub fn batch_to_out(b: &Batch) -> BatchOut {
    BatchOut {
        main: b.main.iter().map(to_out).collect(),
        easy_backups: b.easy_backups.iter().map(to_out).collect(),
        hard_backups: b.hard_backups.iter().map(to_out).collect(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptsQuery {
    pub uid: Option<String>,
    pub category: Option<Category>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct InitializeIn {
    pub uid: String,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeOut {
    pub message: String,
    pub prompt_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ResetIn {
    pub uid: String,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOut {
    pub message: String,
    pub prompt_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreIn {
    pub uid: String,
    pub prompt_id: String,
    pub score: f64,
}
#[derive(Serialize)]
pub struct ScoreOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
