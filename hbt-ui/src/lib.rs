//! hbt-ui library - Hediyele blind test web UI
//!
//! Serves the email gate, preference survey, blind comparison and done
//! screens, and passes recommendations and results through to the
//! blind-test API.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod client;
pub mod compare;
pub mod tabs;

use client::{BlindTestClient, RecommendationProvider, SessionHistory, SubmissionSink};
use tabs::TabRegistry;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Open browser tabs
    pub tabs: Arc<TabRegistry>,
    /// Recommendation source for completed surveys
    pub provider: Arc<dyn RecommendationProvider>,
    /// Destination of finished comparisons
    pub sink: Arc<dyn SubmissionSink>,
    /// Previous session lookup
    pub history: Arc<dyn SessionHistory>,
}

impl AppState {
    /// State backed by one blind-test API client
    pub fn new(client: Arc<BlindTestClient>) -> Self {
        Self::with_backends(client.clone(), client.clone(), client)
    }

    pub fn with_backends(
        provider: Arc<dyn RecommendationProvider>,
        sink: Arc<dyn SubmissionSink>,
        history: Arc<dyn SessionHistory>,
    ) -> Self {
        Self {
            tabs: Arc::new(TabRegistry::new()),
            provider,
            sink,
            history,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    // Tab-scoped API (requires x-tab-id)
    let tab_api = Router::new()
        .route("/api/identity", get(api::get_identity).post(api::set_identity))
        .route("/api/logout", post(api::logout))
        .route("/api/survey", post(api::submit_survey))
        .route("/api/previous-sessions", get(api::previous_sessions))
        .route("/api/compare", get(api::get_round))
        .route("/api/compare/select", post(api::select))
        .route("/api/compare/bad", post(api::mark_bad))
        .route("/api/compare/advance", post(api::advance))
        .route("/api/compare/retreat", post(api::retreat))
        .route("/api/compare/submit", post(api::submit));

    // Public routes
    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/compare", get(api::serve_index))
        .route("/done", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/tabs", post(api::open_tab))
        .route("/api/survey/options", get(api::survey_options))
        .route("/api/survey/random", get(api::random_survey))
        .merge(api::health_routes());

    Router::new()
        .merge(tab_api)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
