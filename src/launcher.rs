use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::ai::{AiError, TriviaAi};
use crate::catalog::{self, DEFAULT_CATEGORY_ID, RANDOM_CATEGORY_ID, ResolvedCategory};
use crate::game_logic::models::{DifficultySelector, GameMode, GameSettings, Question};
use crate::game_logic::prepare::prepare_questions;
use crate::store::question_cache::CacheStatus;
use crate::store::{QuestionCache, StorageError};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(
        "You are offline and no cached questions cover this category. Pick a category you played before or download it from the question bank."
    )]
    Offline,
    #[error("Question generation failed: {0}")]
    Generation(#[from] AiError),
    #[error("The AI did not produce any playable questions. Please try again.")]
    EmptyPool,
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Everything a session needs to start.
#[derive(Debug, Clone)]
pub struct PreparedGame {
    pub settings: GameSettings,
    pub category: ResolvedCategory,
    pub questions: Vec<Question>,
    pub from_cache: bool,
    /// Non-fatal problems to show once the game starts.
    pub notices: Vec<String>,
}

fn storage_notice(error: &StorageError) -> String {
    match error {
        StorageError::Full { .. } => {
            "Storage is full. Try clearing the question cache.".to_string()
        }
        _ => "New questions could not be saved to the cache.".to_string(),
    }
}

/// Start-game flow: cache first, then the generator, then preparation.
#[derive(Debug, Clone)]
pub struct GameLauncher {
    ai: Option<Arc<dyn TriviaAi>>,
    cache: QuestionCache,
    max_questions_fetch: usize,
    enabled_modes: HashSet<GameMode>,
}

impl GameLauncher {
    pub fn new(
        ai: Option<Arc<dyn TriviaAi>>,
        cache: QuestionCache,
        max_questions_fetch: usize,
        enabled_modes: HashSet<GameMode>,
    ) -> Self {
        Self {
            ai,
            cache,
            max_questions_fetch,
            enabled_modes,
        }
    }

    pub fn is_online(&self) -> bool {
        self.ai.is_some()
    }

    pub fn cache(&self) -> &QuestionCache {
        &self.cache
    }

    pub fn is_mode_enabled(&self, mode: GameMode) -> bool {
        self.enabled_modes.contains(&mode)
    }

    #[tracing::instrument(skip(self, settings), fields(
        game.mode = %settings.game_mode,
        game.category = %settings.category,
        game.difficulty = %settings.difficulty.as_str()
    ))]
    pub async fn prepare_game(&self, settings: GameSettings) -> Result<PreparedGame, LaunchError> {
        let mut settings = settings.normalized();
        if !self.is_mode_enabled(settings.game_mode) {
            return Err(LaunchError::InvalidSettings(format!(
                "game mode '{}' is disabled on this server",
                settings.game_mode
            )));
        }

        let category = catalog::resolve_category(&settings.category, &mut rand::thread_rng());
        settings.category = category.id.clone();

        let mut notices = Vec::new();
        let cached = self
            .cache
            .get_cached(&category.id, settings.difficulty, settings.total_questions)
            .await;
        let from_cache = cached.is_some();

        let pool = match cached {
            Some(questions) => {
                tracing::info!(pool.size = questions.len(), "Starting from cached questions");
                questions
            }
            None => {
                let ai = self.ai.as_ref().ok_or(LaunchError::Offline)?;
                tracing::info!(category.name = %category.name, "Generating new questions");
                let generated = ai
                    .generate_questions(
                        &category.id,
                        &category.name,
                        self.max_questions_fetch,
                        settings.difficulty,
                    )
                    .await?;
                if let Err(e) = self
                    .cache
                    .save_cached(&category.id, settings.difficulty, &generated)
                    .await
                {
                    tracing::warn!(error = %e, "Failed to cache generated questions");
                    notices.push(storage_notice(&e));
                }
                generated
            }
        };

        let questions = prepare_questions(&pool, &settings, &mut rand::thread_rng());
        if questions.is_empty() {
            return Err(LaunchError::EmptyPool);
        }

        Ok(PreparedGame {
            settings,
            category,
            questions,
            from_cache,
            notices,
        })
    }

    /// Tops the general/mixed cache up to a full fetch when online. Failures
    /// are only logged.
    #[tracing::instrument(skip(self))]
    pub async fn precache_general(&self) {
        let Some(ai) = self.ai.as_ref() else {
            tracing::debug!("Offline, skipping pre-cache");
            return;
        };
        let mixed = DifficultySelector::Mixed;
        if self
            .cache
            .get_cached(DEFAULT_CATEGORY_ID, mixed, self.max_questions_fetch)
            .await
            .is_some()
        {
            tracing::debug!("General questions already cached");
            return;
        }

        let category = catalog::resolve_category(DEFAULT_CATEGORY_ID, &mut rand::thread_rng());
        match ai
            .generate_questions(&category.id, &category.name, self.max_questions_fetch, mixed)
            .await
        {
            Ok(questions) => match self.cache.save_cached(&category.id, mixed, &questions).await {
                Ok(added) => tracing::info!(cache.added = added, "Pre-cached general questions"),
                Err(e) => tracing::warn!(error = %e, "Failed to save pre-cached questions"),
            },
            Err(e) => tracing::warn!(error = %e, "Failed to pre-cache general questions"),
        }
    }

    /// Fetches one more batch of mixed-difficulty questions for a category.
    #[tracing::instrument(skip(self))]
    pub async fn refill_cache(&self, category_id: &str) -> Result<CacheStatus, LaunchError> {
        if category_id == RANDOM_CATEGORY_ID || catalog::find(category_id).is_none() {
            return Err(LaunchError::InvalidSettings(format!(
                "'{}' is not a downloadable category",
                category_id
            )));
        }
        let ai = self.ai.as_ref().ok_or(LaunchError::Offline)?;
        let category = catalog::resolve_category(category_id, &mut rand::thread_rng());
        let mixed = DifficultySelector::Mixed;

        let questions = ai
            .generate_questions(&category.id, &category.name, self.max_questions_fetch, mixed)
            .await?;
        let added = self.cache.save_cached(&category.id, mixed, &questions).await?;
        let status = self.cache.status(&category.id, mixed).await;
        tracing::info!(cache.added = added, cache.count = status.count, "Refilled category cache");
        Ok(status)
    }
}
