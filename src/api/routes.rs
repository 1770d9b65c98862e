//! Route definitions for the API.

use std::sync::Arc;

use axum::{middleware, routing::get, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::auth::{identity_middleware, require_confirmed_account};
use super::SharedState;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    // Build the OpenAPI spec once at startup
    let openapi = super::openapi::build_openapi();

    let auth_service = Arc::new(state.auth_service());

    // Confirmed-account group: anonymous → 401, unconfirmed → 403. Permission
    // checks ("admin" on roles/users) happen inside each handler through the
    // explicit authorize guard.
    let protected = Router::new()
        .nest("/auth", handlers::auth::protected_router())
        .merge(handlers::roles::router())
        .nest("/users", handlers::users::router())
        .layer(middleware::from_fn(require_confirmed_account));

    // Identity extraction covers the whole v1 surface so even public
    // handlers can inspect who is calling.
    let api_v1 = Router::new()
        .nest("/auth", handlers::auth::public_router())
        .merge(protected)
        .route(
            "/openapi.json",
            get(move || async move { Json(openapi.clone()) }),
        )
        .layer(middleware::from_fn_with_state(
            auth_service,
            identity_middleware,
        ));

    Router::new()
        // Health endpoints (no auth required)
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .nest("/api/v1", api_v1)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
