//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::ledger::Ledger;
use crate::store::LedgerStore;

pub use middleware::ApiKeyDigest;
pub use routes::create_router;

/// Build the application router
pub fn build_router<S: LedgerStore>(ledger: Ledger<S>, api_key: ApiKeyDigest) -> Router {
    // Axum layers run in reverse order of addition: logging -> auth -> handler
    let protected_routes = create_router::<S>()
        .layer(axum_middleware::from_fn_with_state(
            api_key,
            middleware::auth_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .nest("/api/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(ledger)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
