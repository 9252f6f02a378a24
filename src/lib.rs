pub mod config;
pub mod github;
pub mod links;
pub mod metrics;
pub mod querier;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use config::AppConfig;
use querier::MetricsQuerier;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Shared application state accessible to all request handlers.
pub struct AppState {
    /// Service for collecting a team's GitHub metrics.
    pub querier: MetricsQuerier,
    /// Application configuration loaded from environment variables.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let querier = MetricsQuerier::new(config.clone());
        Self { querier, config }
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/auth/github", get(authorize_github))
        .route("/api/teams/{team_id}/metrics", get(get_team_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "github-team-metrics",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Sends the caller to GitHub's OAuth authorization page.
pub async fn authorize_github(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(&state.config.oauth_authorize_url())
}

pub async fn get_team_metrics(
    Path(team_id): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    // No token means the caller has not completed the OAuth flow; redirect
    // them to GitHub without touching the API.
    let Some(token) = bearer_token(&headers) else {
        tracing::debug!(%team_id, "no access token supplied, redirecting to GitHub authorization");
        return Redirect::temporary(&state.config.oauth_authorize_url()).into_response();
    };

    let Some(hyperlinks) = state.config.team_links.get(&team_id) else {
        return (StatusCode::NOT_FOUND, "Team Not Found".to_string()).into_response();
    };

    match state.querier.collect(&token, hyperlinks).await {
        Ok(metrics) => {
            tracing::debug!(%team_id, "Returning team metrics");
            Json(metrics).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to fetch GitHub data for team {}: {}", team_id, e);

            if let Some(octocrab::Error::GitHub { source, .. }) =
                e.downcast_ref::<octocrab::Error>()
            {
                if source.message.to_lowercase().contains("rate limit") {
                    return (
                        StatusCode::TOO_MANY_REQUESTS,
                        "GitHub Rate Limit Exceeded".to_string(),
                    )
                        .into_response();
                }
                if source.message.to_lowercase().contains("not found") {
                    return (StatusCode::NOT_FOUND, "Repository Not Found".to_string())
                        .into_response();
                }
                // Anything else surfaces the upstream message as-is.
                return (StatusCode::INTERNAL_SERVER_ERROR, source.message.clone())
                    .into_response();
            }

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            )
                .into_response()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
