use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod ai;
mod catalog;
mod config;
mod error;
mod game_logic;
mod launcher;
mod session;
mod state;
mod store;
mod web;

use crate::ai::{GeminiClient, TriviaAi};
use crate::config::load_settings;
use crate::error::Result as AppResult;
use crate::launcher::GameLauncher;
use crate::session::SessionManagerHandle;
use crate::state::AppState;
use crate::store::{FileStore, KeyValueStore, MemoryStore, QuestionCache, ResultRecorder};
use crate::web::run_server;

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,tower_http=debug", env!("CARGO_PKG_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_settings = load_settings()?;
    tracing::info!("Configuration loaded: {:?}", app_settings);

    let store: Arc<dyn KeyValueStore> = if app_settings.storage.in_memory {
        tracing::warn!("In-memory storage: cache, scores and achievements are lost on restart");
        match app_settings.storage.quota_bytes {
            Some(quota) => Arc::new(MemoryStore::with_quota(quota)),
            None => Arc::new(MemoryStore::new()),
        }
    } else {
        let store_path = app_settings.storage.store_path();
        let store = FileStore::open(&store_path, app_settings.storage.quota_bytes).await?;
        tracing::info!(store.path = %store_path.display(), "Persistent store opened");
        Arc::new(store)
    };

    let ai: Option<Arc<dyn TriviaAi>> = match GeminiClient::from_config(&app_settings.ai) {
        Some(client) => {
            tracing::info!(ai.model = %app_settings.ai.question_model, "AI question generation enabled");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("No AI API key configured. Running offline on cached questions");
            None
        }
    };

    let cache = QuestionCache::new(store.clone(), app_settings.storage.cache_ttl());
    let launcher = GameLauncher::new(
        ai.clone(),
        cache,
        app_settings.ai.max_questions_fetch,
        app_settings.games.enabled_modes.clone(),
    );
    let recorder = ResultRecorder::new(store);

    let precache_launcher = launcher.clone();
    tokio::spawn(async move {
        precache_launcher.precache_general().await;
    });

    let session_manager = SessionManagerHandle::spawn(32, ai, recorder.clone());

    let app_state = AppState {
        session_manager,
        launcher,
        recorder,
    };

    run_server(app_state, app_settings.server).await?;

    Ok(())
}
