use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::jwt::{Claims, JwtKeys};
use crate::{error::AppError, state::AppState};

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let raw = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

    // The scheme is optional; a bare token is accepted too.
    Ok(raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim())
}

/// Valid token claims, without consulting the session cache.
pub struct TokenClaims(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for TokenClaims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized("invalid or expired token".into())
        })?;
        Ok(TokenClaims(claims))
    }
}

/// Authenticated user: valid token *and* a live session marker.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_uid: String,
    pub role_uid: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TokenClaims(claims) = TokenClaims::from_request_parts(parts, state).await?;

        if !state.sessions.session_exists(&claims.sub).await? {
            warn!(user_uid = %claims.sub, "token presented without live session");
            return Err(AppError::Unauthorized("session expired or revoked".into()));
        }

        Ok(AuthUser {
            user_uid: claims.sub,
            role_uid: claims.role_uid,
        })
    }
}
