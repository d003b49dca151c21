//! Bearer credential extraction
//!
//! Every `/api` handler takes an [`AuthenticatedUser`]. The credential is
//! resolved by the configured [`Authenticator`](crate::collaborators::Authenticator).
//! A missing, malformed or rejected credential yields 401.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use notebook_common::Error;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Owner id of the calling user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthenticated("Missing bearer credential".to_string()))?;

        match state.authenticator.authenticate(token).await {
            Ok(user_id) => Ok(AuthenticatedUser(user_id)),
            Err(Error::Authorization(reason)) => {
                warn!(path = %parts.uri.path(), reason = %reason, "Rejected credential");
                Err(ApiError::Unauthenticated(format!("Invalid credential: {}", reason)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
