//! Axum router construction for the game API.
//!
//! Assembles every route into a single [`Router`] with CORS and request
//! tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the game API.
///
/// Account routes are open. Every other route requires a session cookie,
/// enforced by the [`CurrentUser`](crate::auth::CurrentUser) extractor.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Accounts
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", get(handlers::logout))
        // City queries
        .route("/api/cities", get(handlers::list_cities))
        .route("/api/city/info", get(handlers::city_info))
        .route("/api/resources", get(handlers::resources))
        .route("/api/troops", get(handlers::troops))
        .route("/api/building-queue", get(handlers::building_queue))
        .route("/api/recruit-queue", get(handlers::recruit_queue))
        .route("/api/buildings", get(handlers::buildings))
        .route("/api/building/upgrade", post(handlers::upgrade_building))
        .route("/api/building/{kind}", get(handlers::building_info))
        // Recruitment
        .route("/api/recruit/list", get(handlers::recruit_list))
        .route("/api/recruit/confirm", post(handlers::recruit_confirm))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
