//! Axum state and the authentication gate extractor.

use super::challenge::ChallengeManager;
use super::cookie::session_token_from_headers;
use super::session::SessionManager;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::AppError;
use crate::models::IdentityRef;
use crate::storage::CredentialStore;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub challenges: Arc<ChallengeManager>,
    pub sessions: Arc<SessionManager>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire both managers to the same store and clock.
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>, config: Config) -> Self {
        let challenges =
            ChallengeManager::new(store.clone(), clock.clone(), config.challenge_ttl());
        let sessions = SessionManager::new(store, clock, config.session_ttl());

        Self {
            challenges: Arc::new(challenges),
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        }
    }
}

/// Authenticated session extractor.
///
/// Extracts the session from the `session-token` cookie.
/// Returns 401 Unauthorized if the cookie is missing, unknown, revoked or expired,
/// with the same body in every case.
pub struct AuthSession {
    pub identity: IdentityRef,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token_from_headers(&parts.headers).ok_or(AppError::Unauthenticated)?;

        let identity = state
            .sessions
            .resolve_session(&token)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        Ok(AuthSession { identity, token })
    }
}
