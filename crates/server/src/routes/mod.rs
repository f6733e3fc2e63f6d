//! API route handlers for the Pokestrator monitor.

pub mod health;
pub mod snapshot;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET /api/health - Health check
/// - GET /api/state - Current orchestrator snapshot rebuilt from the log tail
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", snapshot::router())
        .with_state(state)
}
