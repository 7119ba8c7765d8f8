use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::AppState;
use super::errors::AppError;
use crate::auth::bearer_token;
use crate::models::User;

/// The caller, resolved from the `Authorization` header.
///
/// Rejects with 401 when the token is missing or fails verification, and
/// with 404 when it names a user that no longer exists.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("No token provided".into()))?;

        let claims = state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "rejected session token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        let user = state
            .db()?
            .get_user(&claims.id)?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        Ok(AuthUser(user))
    }
}
