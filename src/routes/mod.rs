//! API route handlers.

pub mod auth;
pub mod user;

use crate::auth::middleware::AppState;
use crate::middleware::security_headers;
use axum::{routing::get, routing::post, Router};
use tower_http::cors::CorsLayer;

/// Largest accepted request body. Auth payloads are a few hundred bytes.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth endpoints
        .route("/api/auth/challenge", post(auth::request_challenge))
        .route("/api/auth/verify", post(auth::verify_challenge))
        .route("/api/auth/logout", post(auth::logout))
        // Session-protected endpoints
        .route("/api/user/me", get(user::me))
}

/// The full application: routes, body limit, CORS and security headers.
pub fn app(state: AppState) -> Router {
    // Explicit CORS: deny all cross-origin requests (single-origin deployment).
    // CorsLayer::new() with no allowed origins rejects all CORS preflight requests.
    let cors = CorsLayer::new();

    api_router()
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state)
}
