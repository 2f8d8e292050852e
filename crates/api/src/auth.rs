//! Bearer-token authentication.
//!
//! Tokens are opaque random strings; only their SHA-256 digest is stored in
//! the `auth_tokens` table.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use database::auth_token;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller's user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

/// Hex SHA-256 of a bearer token, as stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Create a token for a user and store its digest. Returns the plain token.
pub async fn issue_token(db: &database::Database, user_id: &str) -> Result<String, ApiError> {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    auth_token::insert_token(db.pool(), &hash_token(&token), user_id).await?;
    Ok(token)
}

/// Revoke a plain token. Returns false when it was not on record.
pub async fn revoke_issued_token(db: &database::Database, token: &str) -> Result<bool, ApiError> {
    Ok(auth_token::revoke_token(db.pool(), &hash_token(token)).await?)
}

fn bearer(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or(ApiError::Unauthorized)?;
        let user_id = auth_token::find_user_by_token_hash(state.db.pool(), &hash_token(token))
            .await?
            .ok_or(ApiError::Unauthorized)?;
        Ok(AuthUser(user_id))
    }
}
