//! Auth API endpoints.

use crate::auth::cookie::{clear_session_cookie, session_cookie, session_token_from_headers};
use crate::auth::middleware::AppState;
use crate::auth::verify::verify_signature;
use crate::error::AppError;
use crate::models::{
    ChallengeRequest, ChallengeResponse, LogoutResponse, VerifyRequest, VerifyResponse,
};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};

const MAX_ADDRESS_LEN: usize = 128;
const MAX_MESSAGE_LEN: usize = 1024;
const MAX_SIGNATURE_LEN: usize = 256;

/// Reject empty or oversized request fields.
fn require_field(field: &'static str, value: &str, max_len: usize) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::validation(field, format!("{} is required", field)));
    }
    if value.len() > max_len {
        return Err(AppError::validation(
            field,
            format!("{} must be at most {} bytes", field, max_len),
        ));
    }
    Ok(())
}

/// POST /api/auth/challenge — Request a message to sign
pub async fn request_challenge(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_field("address", &req.address, MAX_ADDRESS_LEN)?;

    let issued = state.challenges.issue_challenge(&req.address).await?;

    Ok(Json(ChallengeResponse {
        message: issued.message,
        expires_at: issued.expires_at,
    }))
}

/// POST /api/auth/verify — Verify signature and create session
pub async fn verify_challenge(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_field("address", &req.address, MAX_ADDRESS_LEN)?;
    require_field("message", &req.message, MAX_MESSAGE_LEN)?;
    require_field("signature", &req.signature, MAX_SIGNATURE_LEN)?;

    let address = req.address.to_lowercase();

    // Checked before the challenge is touched, so a bad signature leaves it redeemable
    if !verify_signature(&address, &req.message, &req.signature) {
        tracing::warn!(action = "auth_failed", address = %address, reason = "signature", "Invalid signature");
        return Err(AppError::Unauthorized("Invalid signature".to_string()));
    }

    let identity = match state.challenges.consume_challenge(&address, &req.message).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(action = "auth_failed", address = %address, reason = %e, "Challenge rejected");
            return Err(e.into());
        }
    };

    let session = state.sessions.create_session(&identity).await?;

    tracing::info!(action = "auth_success", address = %identity.address, identity_id = %identity.id, "Wallet authenticated");

    let cookie = session_cookie(
        &session.token,
        state.sessions.ttl().as_secs(),
        state.config.secure_cookies,
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(VerifyResponse {
            success: true,
            address: identity.address,
        }),
    ))
}

/// POST /api/auth/logout — Invalidate current session (idempotent)
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token_from_headers(&headers) {
        state.sessions.revoke_session(&token).await?;
        tracing::info!(action = "logout", "Session revoked");
    }

    Ok((
        [(
            header::SET_COOKIE,
            clear_session_cookie(state.config.secure_cookies),
        )],
        Json(LogoutResponse { success: true }),
    ))
}
