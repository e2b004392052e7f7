//! Generative text client for prompt-batch production.
//!
//! We only call chat.completions and request a strict JSON object. Calls are
//! instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::GenPrompts;
use crate::domain::Category;
use crate::error::ModelError;
use crate::util::fill_template;

/// What the scheduler asks the model for: a batch of candidate prompts in a
/// category, aimed at a difficulty band, optionally personalized by the
/// user's onboarding context.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
  pub category: Category,
  pub batch: usize,
  pub d_low: f64,
  pub d_high: f64,
  pub context: Option<String>,
}

/// One raw candidate from the model. The category comes back as text and is
/// validated downstream; malformed entries are dropped there, not here.
#[derive(Clone, Debug, Deserialize)]
pub struct CandidatePrompt {
  #[serde(default, alias = "prompt")]
  pub text: String,
  #[serde(default)]
  pub category: String,
  // Present on the wire; the pool keeps only the prompt text.
  #[serde(default)]
  #[allow(dead_code)]
  pub answer: Option<String>,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
  async fn generate_prompts(
    &self,
    prompts: &GenPrompts,
    req: &GenerationRequest,
  ) -> Result<Vec<CandidatePrompt>, ModelError>;
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub gen_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let gen_model =
      std::env::var("OPENAI_GEN_MODEL").unwrap_or_else(|_| "gpt-4.1".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, gen_model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system), fields(model = %self.gen_model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    temperature: f32,
  ) -> Result<T, ModelError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.gen_model.clone(),
      messages: vec![ChatMessageReq { role: "system".into(), content: system.into() }],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: Some(4096),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "parley-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(ModelError::Status { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    Ok(serde_json::from_str::<T>(&text)?)
  }
}

#[async_trait]
impl ModelClient for OpenAI {
  #[instrument(
    level = "info",
    skip(self, prompts, req),
    fields(category = %req.category, batch = req.batch, model = %self.gen_model)
  )]
  async fn generate_prompts(
    &self,
    prompts: &GenPrompts,
    req: &GenerationRequest,
  ) -> Result<Vec<CandidatePrompt>, ModelError> {
    let system = fill_template(
      &prompts.generation_system,
      &[
        ("batch", &req.batch.to_string()),
        ("category", req.category.as_str()),
        ("d_low", &format!("{:.0}", req.d_low)),
        ("d_high", &format!("{:.0}", req.d_high)),
        ("context", req.context.as_deref().unwrap_or("(none provided)")),
      ],
    );

    let start = std::time::Instant::now();
    let batch: GenBatch = self.chat_json(&system, 0.7).await?;
    info!(
      elapsed = ?start.elapsed(),
      returned = batch.prompts.len(),
      "Model batch received"
    );
    Ok(batch.prompts)
  }
}

/// Stand-in used when no API key is configured. Every call fails as
/// `Disabled`, which the scheduler treats as a zero-yield generation.
pub struct DisabledModel;

#[async_trait]
impl ModelClient for DisabledModel {
  async fn generate_prompts(
    &self,
    _prompts: &GenPrompts,
    _req: &GenerationRequest,
  ) -> Result<Vec<CandidatePrompt>, ModelError> {
    Err(ModelError::Disabled)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct GenBatch {
  #[serde(default)]
  prompts: Vec<CandidatePrompt>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
