use axum::{
    Router,
    routing::{any, delete, get, post},
};
use http::{HeaderValue, Method, header};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::compression::{CompressionLayer, CompressionLevel};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::error::{ConfigError, Result as AppResult};
use crate::state::AppState;

pub mod error;
pub mod handlers;
pub mod ws;

pub use self::error::WebError;

const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const LIMITER_SIZE_WARNING: usize = 1_000_000;

/// REST endpoints for starting games, browsing categories, scores and
/// achievements, and managing the question cache, plus the game socket.
fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/games", post(handlers::create_game_handler))
        .route("/api/categories", get(handlers::list_categories_handler))
        .route("/api/high-scores/{mode}", get(handlers::high_scores_handler))
        .route("/api/achievements", get(handlers::achievements_handler))
        .route("/api/cache", delete(handlers::clear_cache_handler))
        .route("/api/cache/{category}", get(handlers::cache_status_handler))
        .route(
            "/api/cache/{category}/refill",
            post(handlers::refill_cache_handler),
        )
        .route("/ws", any(ws::ws_handler))
}

/// Parses the configured origins, skipping any that are not valid header
/// values.
fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(cors.origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins = parse_origins(origins);
    if origins.is_empty() {
        tracing::info!("No CORS origins configured, cross-origin requests are refused");
        return CorsLayer::new();
    }

    tracing::info!(cors.origins.count = origins.len(), "CORS origins configured");
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

#[tracing::instrument(skip(app_state, server_config), fields(
    server.port = server_config.port,
    rate_limit.period_ms = server_config.rate_limit_period_ms,
    rate_limit.burst = server_config.rate_limit_burst
))]
pub async fn run_server(app_state: AppState, server_config: ServerConfig) -> AppResult<()> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(server_config.rate_limit_period_ms)
            .burst_size(server_config.rate_limit_burst)
            .finish()
            .ok_or_else(|| ConfigError::InvalidValue("rate limiter settings".to_string()))?,
    );

    let limiter = governor_conf.limiter().clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(LIMITER_SWEEP_INTERVAL).await;
            if limiter.len() > LIMITER_SIZE_WARNING {
                tracing::warn!(rate_limiter.keys = limiter.len(), "Rate limiter is tracking many clients");
            }
            limiter.retain_recent();
        }
    });

    let app = api_router()
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CompressionLayer::new()
                .quality(CompressionLevel::Default)
                .gzip(true),
        )
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors_layer(&server_config.cors_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(server.address = %addr, "Quiz server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_origins_are_skipped() {
        let origins = vec![
            "http://localhost:5173".to_string(),
            "bad\norigin".to_string(),
            "https://quiz.example.com".to_string(),
        ];
        let parsed = parse_origins(&origins);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], "http://localhost:5173");
    }

    #[test]
    fn test_no_origins_parse_to_empty() {
        assert!(parse_origins(&[]).is_empty());
    }
}
