//! Route configuration.

use crate::auth::auth_gate;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Session lifecycle
        .route("/auth/authenticate", post(handlers::authenticate))
        .route("/auth/verify", get(handlers::verify))
        .route("/auth/logout", post(handlers::logout))
        // Content routes (reachable via content tokens)
        .route(
            "/torrents/{hash}/contents/{indices}/data",
            get(handlers::content_data),
        )
        .route(
            "/torrents/{hash}/contents/{indices}/subtitles",
            get(handlers::content_subtitles),
        )
        .route(
            "/torrents/{hash}/contents/{indices}/token",
            get(handlers::mint_content_token),
        )
        // Filesystem browsing
        .route("/directory-list", get(handlers::directory_list))
        // Business routes
        .route("/history", get(handlers::history))
        .route(
            "/notifications",
            get(handlers::get_notifications).delete(handlers::clear_notifications),
        )
        .route(
            "/settings",
            get(handlers::get_settings).patch(handlers::patch_settings),
        )
        .route("/settings/{property}", get(handlers::get_setting_property));

    // Middleware layers are applied in reverse order (outermost first).
    // Order of execution: TraceLayer -> AuthGate -> Handler. The gate
    // applies rate limiting to content routes itself, so ordering between
    // limiter and credential evaluation is fixed in one place.
    router
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
