//! Bearer-token identity
//!
//! Accounts are provisioned elsewhere; a request is authenticated when its
//! `Authorization: Bearer <token>` header names a known user.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AppState;
use crate::domain::aggregates::User;
use crate::error::AppError;

/// The authenticated caller.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let Some(token) = parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()).and_then(bearer_token) else {
            tracing::info!(target: "security", uri = %parts.uri, "Missing bearer token");
            return Err(AppError::Unauthorized);
        };

        let user = {
            let mut tx = state.store.begin().await?;
            tx.find_user_by_token(token).await?
        };
        let Some(user) = user else {
            tracing::warn!(target: "security", uri = %parts.uri, "Unknown bearer token");
            return Err(AppError::Unauthorized);
        };

        let user = CurrentUser(user);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
