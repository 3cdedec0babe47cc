//! Endpoints for the signed-in wallet.

use crate::auth::middleware::AuthSession;
use crate::models::IdentityRef;
use axum::Json;

/// GET /api/user/me — The identity bound to the session cookie
pub async fn me(session: AuthSession) -> Json<IdentityRef> {
    Json(session.identity)
}
