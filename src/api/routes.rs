use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Hero sessions
        .route("/hero/sessions", post(handlers::mount_session))
        .route(
            "/hero/sessions/:id",
            get(handlers::get_session).delete(handlers::unmount_session),
        )
        .route(
            "/hero/sessions/:id/intersections",
            post(handlers::report_intersection),
        )
}
