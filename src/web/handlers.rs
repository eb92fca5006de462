use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::error::{Result as WebResult, WebError};
use crate::catalog::{self, CATEGORIES, Category};
use crate::game_logic::models::{DifficultySelector, GameMode, GameSettings};
use crate::session::SessionDetails;
use crate::state::AppState;
use crate::store::achievements::{AchievementProgress, AchievementStatus};
use crate::store::question_cache::CacheStatus;
use crate::store::scores::ScoreEntry;

#[derive(Serialize, Debug)]
pub struct CategoriesResponse {
    pub categories: &'static [Category],
    pub online: bool,
}

#[derive(Serialize, Debug)]
pub struct AchievementsResponse {
    pub achievements: Vec<AchievementStatus>,
    pub progress: AchievementProgress,
}

#[derive(Serialize, Debug)]
pub struct ClearCacheResponse {
    pub cleared: usize,
}

#[derive(Deserialize, Debug, Default)]
pub struct CacheQuery {
    pub difficulty: Option<String>,
}

pub async fn create_game_handler(
    State(app_state): State<AppState>,
    Json(settings): Json<GameSettings>,
) -> WebResult<Json<SessionDetails>> {
    tracing::info!(
        game.mode = %settings.game_mode,
        game.category = %settings.category,
        "HTTP: Received create_game request"
    );

    let prepared = app_state.launcher.prepare_game(settings).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to prepare game");
        WebError::from(e)
    })?;

    let details = app_state
        .session_manager
        .create_session(prepared)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create session");
            WebError::InternalServerError(e)
        })?;

    Ok(Json(details))
}

pub async fn list_categories_handler(
    State(app_state): State<AppState>,
) -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: CATEGORIES,
        online: app_state.launcher.is_online(),
    })
}

pub async fn high_scores_handler(
    State(app_state): State<AppState>,
    Path(mode): Path<String>,
) -> WebResult<Json<Vec<ScoreEntry>>> {
    let mode: GameMode = mode.parse().map_err(WebError::BadRequest)?;
    if mode == GameMode::Versus {
        return Err(WebError::BadRequest(
            "Versus games do not keep high scores".to_string(),
        ));
    }
    Ok(Json(app_state.recorder.high_scores().top(mode).await?))
}

pub async fn achievements_handler(
    State(app_state): State<AppState>,
) -> WebResult<Json<AchievementsResponse>> {
    let achievements = app_state.recorder.achievements();
    Ok(Json(AchievementsResponse {
        achievements: achievements.statuses().await?,
        progress: achievements.progress().await?,
    }))
}

pub async fn cache_status_handler(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<CacheQuery>,
) -> WebResult<Json<CacheStatus>> {
    if catalog::find(&category).is_none() {
        return Err(WebError::NotFound(format!("Unknown category '{}'", category)));
    }
    let difficulty = query
        .difficulty
        .map(DifficultySelector::from)
        .unwrap_or_default();
    Ok(Json(
        app_state.launcher.cache().status(&category, difficulty).await,
    ))
}

pub async fn refill_cache_handler(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
) -> WebResult<Json<CacheStatus>> {
    tracing::info!(game.category = %category, "HTTP: Received refill_cache request");
    let status = app_state.launcher.refill_cache(&category).await?;
    Ok(Json(status))
}

pub async fn clear_cache_handler(
    State(app_state): State<AppState>,
) -> WebResult<Json<ClearCacheResponse>> {
    let cleared = app_state.launcher.cache().clear_all().await?;
    tracing::info!(cache.cleared = cleared, "HTTP: Cleared question cache");
    Ok(Json(ClearCacheResponse { cleared }))
}
