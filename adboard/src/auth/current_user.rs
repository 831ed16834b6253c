//! Extraction of the authenticated user from request headers.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, trace};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    errors::{Error, Result},
};

/// Extracts [`CurrentUser`] from the `Authorization: Bearer <token>` header.
///
/// A missing or non-Bearer header rejects with 401; a present but invalid or
/// expired token rejects with 403.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION).ok_or(Error::MissingToken)?;

        let auth_str = auth_header.to_str().map_err(|e| {
            trace!("Invalid authorization header: {e}");
            Error::MissingToken
        })?;

        // Check for Bearer token format
        let token = auth_str.strip_prefix("Bearer ").ok_or(Error::MissingToken)?;

        let user = session::verify_session_token(token, &state.config)?;
        debug!("Authenticated user: {}", user.id);
        Ok(user)
    }
}
