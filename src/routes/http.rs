//! HTTP endpoint handlers. These are thin wrappers that forward to the
//! scheduler; each handler is instrumented and logs parameters and basic
//! result info.
//!
//! Caller identity is established upstream (session middleware); handlers
//! trust the `uid` they are given.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use tracing::{info, instrument};

use crate::domain::Category;
use crate::error::ApiError;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> Json<HealthOut> {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, q))]
pub async fn http_get_prompts(
  State(state): State<Arc<AppState>>,
  Query(q): Query<PromptsQuery>,
) -> Result<Json<BatchOut>, ApiError> {
  let uid = q.uid.ok_or_else(|| ApiError::bad_request("Missing uid"))?;
  let category = q.category.unwrap_or(Category::GenericVocab);

  let batch = state.scheduler.select_batch(&uid, category, q.batch_size).await?;
  info!(
    target: "scheduler",
    %uid, %category,
    main = batch.main.len(),
    easy = batch.easy_backups.len(),
    hard = batch.hard_backups.len(),
    "HTTP prompt batch served"
  );
  Ok(Json(batch_to_out(&batch)))
}

#[instrument(level = "info", skip(state, body), fields(%body.uid))]
pub async fn http_post_initialize(
  State(state): State<Arc<AppState>>,
  Json(body): Json<InitializeIn>,
) -> Result<Json<InitializeOut>, ApiError> {
  let prompt_count = state.scheduler.initialize_pool(&body.uid).await?;
  info!(target: "scheduler", uid = %body.uid, prompt_count, "HTTP pool initialized");
  Ok(Json(InitializeOut {
    message: "Prompts initialized successfully.".into(),
    prompt_count,
  }))
}

#[instrument(level = "info", skip(state, body), fields(%body.uid))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ResetIn>,
) -> Result<Json<ResetOut>, ApiError> {
  let prompt_count = state.scheduler.reset_pool(&body.uid).await?;
  info!(target: "scheduler", uid = %body.uid, prompt_count, "HTTP pool reset");
  Ok(Json(ResetOut {
    message: "Prompts reset successfully.".into(),
    prompt_count,
  }))
}

#[instrument(level = "info", skip(state, body), fields(%body.uid, %body.prompt_id))]
pub async fn http_post_score(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ScoreIn>,
) -> Result<Json<ScoreOut>, ApiError> {
  if !(0.0..=1.0).contains(&body.score) {
    return Err(ApiError::bad_request("score must be within 0..=1"));
  }
  state
    .store
    .record_score(&body.uid, &body.prompt_id, body.score)
    .await
    .map_err(|e| ApiError::bad_request(e.to_string()))?;
  Ok(Json(ScoreOut { ok: true }))
}
