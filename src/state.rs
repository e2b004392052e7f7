//! Application state: the pool store, profile source, model client, and the
//! scheduler wired on top of them.
//!
//! All collaborators are injected behind traits so tests can substitute
//! doubles; `from_env` assembles the production set (in-memory engines plus
//! the OpenAI client when an API key is present).

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_config_from_env, AppConfig};
use crate::generator::PromptGenerator;
use crate::openai::{DisabledModel, ModelClient, OpenAI};
use crate::scheduler::PromptScheduler;
use crate::store::{MemoryPool, MemoryProfiles, PoolStore, ProfileSource};

pub struct AppState {
    pub store: Arc<dyn PoolStore>,
    pub scheduler: PromptScheduler,
}

impl AppState {
    /// Build state from env: load config, pick the model client, wire the
    /// in-memory store and profiles into the scheduler.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_config_from_env().unwrap_or_default();

        let model: Arc<dyn ModelClient> = match OpenAI::from_env() {
            Some(client) => {
                info!(
                    target: "parley_backend",
                    base_url = %client.base_url,
                    gen_model = %client.gen_model,
                    "OpenAI enabled."
                );
                Arc::new(client)
            }
            None => {
                info!(target: "parley_backend", "OpenAI disabled (no OPENAI_API_KEY). Generation will yield nothing.");
                Arc::new(DisabledModel)
            }
        };

        Self::with_parts(model, MemoryPool::new(), MemoryProfiles::new(), cfg)
    }

    /// Assemble state from explicit collaborators. Tests use this with
    /// scripted doubles.
    pub fn with_parts(
        model: Arc<dyn ModelClient>,
        store: Arc<MemoryPool>,
        profiles: Arc<MemoryProfiles>,
        cfg: AppConfig,
    ) -> Self {
        let store: Arc<dyn PoolStore> = store;
        let profiles: Arc<dyn ProfileSource> = profiles;
        let generator = Arc::new(PromptGenerator::new(
            model,
            Arc::clone(&store),
            Arc::clone(&profiles),
            cfg.prompts.clone(),
        ));
        let scheduler = PromptScheduler::new(
            Arc::clone(&store),
            generator,
            Arc::clone(&profiles),
            cfg.tuning,
        );
        Self { store, scheduler }
    }
}
