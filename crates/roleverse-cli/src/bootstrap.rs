//! Composition root: config, store, model and the two application services.

use anyhow::{Context, Result};
use roleverse_application::{
    SessionLifecycle, ThreadRngRoll, TurnLocks, TurnResolver, TurnSettings,
};
use roleverse_core::SessionRepository;
use roleverse_core::config::{GameConfig, StorageBackend};
use roleverse_core::narrative::NarrativeModel;
use roleverse_core::prompt::PromptLibrary;
use roleverse_infrastructure::config_service::api_key_from_env;
use roleverse_infrastructure::{ConfigService, FileSessionRepository, MemorySessionRepository};
use roleverse_interaction::{CachedNarrativeModel, ChatCompletionClient, UnavailableModel};
use std::sync::Arc;
use std::time::Duration;

pub struct App {
    pub config: GameConfig,
    pub lifecycle: SessionLifecycle,
    pub resolver: TurnResolver,
}

impl App {
    pub async fn build() -> Result<Self> {
        let config_service = ConfigService::default_location()?;
        if config_service.ensure_default_file()? {
            tracing::info!(
                "[Bootstrap] Wrote default config to {}",
                config_service.path().display()
            );
        }
        let config = config_service.load()?;

        let repository = build_repository(&config).await?;
        let model = build_model(&config)?;
        let locks = Arc::new(TurnLocks::new());
        let prompts = Arc::new(PromptLibrary::new()?);

        let lifecycle = SessionLifecycle::new(
            repository.clone(),
            model.clone(),
            locks.clone(),
            prompts.clone(),
            config.rules.chance.clone(),
            config.model.temperature,
        );
        let resolver = TurnResolver::new(
            repository,
            model,
            locks,
            Arc::new(ThreadRngRoll),
            prompts,
            TurnSettings::from(&config),
        );

        Ok(Self {
            config,
            lifecycle,
            resolver,
        })
    }
}

async fn build_repository(config: &GameConfig) -> Result<Arc<dyn SessionRepository>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("[Bootstrap] Using in-memory session store");
            Ok(Arc::new(MemorySessionRepository::new()))
        }
        StorageBackend::File => {
            let repository = match &config.storage.directory {
                Some(dir) => FileSessionRepository::new(dir).await,
                None => FileSessionRepository::default_location().await,
            }
            .context("Failed to open session store")?;
            tracing::info!(
                "[Bootstrap] Using file session store at {}",
                repository.sessions_dir().display()
            );
            Ok(Arc::new(repository))
        }
    }
}

fn build_model(config: &GameConfig) -> Result<Arc<dyn NarrativeModel>> {
    let model: Arc<dyn NarrativeModel> = match api_key_from_env() {
        Some(api_key) => {
            let client = ChatCompletionClient::new(api_key, &config.model)?;
            tracing::info!("[Bootstrap] Narrative model: {}", client.model());
            Arc::new(client)
        }
        None => {
            tracing::warn!("[Bootstrap] No API key in the environment, the game master is unavailable");
            Arc::new(UnavailableModel)
        }
    };

    if !config.cache.enabled {
        return Ok(model);
    }
    Ok(Arc::new(CachedNarrativeModel::new(
        model,
        Duration::from_secs(config.cache.ttl_secs),
        config.cache.max_entries,
    )))
}
