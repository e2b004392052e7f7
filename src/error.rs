//! Error taxonomy for the scheduler pipeline, plus the HTTP error mapping.
//!
//! Only two failure modes reach the caller as errors: a pool read failure
//! (nothing can be selected without pool data) and the terminal no-content
//! condition (cache and fresh generation both came up empty). Everything
//! else degrades the result instead of aborting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pool read failed: {0}")]
    Read(String),
    #[error("pool write failed: {0}")]
    Write(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model disabled (no OPENAI_API_KEY)")]
    Disabled,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("response parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("pool read failed")]
    PoolRead(#[source] StoreError),
    #[error("pool write failed")]
    PoolWrite(#[source] StoreError),
    #[error("no content available")]
    NoContent,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

/// JSON error response carried back through axum handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::NoContent => ApiError::internal(
                "We're having trouble preparing your exercises right now. Please try again in a few moments.",
            ),
            SchedulerError::PoolRead(_) | SchedulerError::PoolWrite(_) => {
                ApiError::internal("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorOut { error: self.message })).into_response()
    }
}
