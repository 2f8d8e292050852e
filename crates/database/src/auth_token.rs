//! Bearer-token lookup. Tokens are stored by hash only.

use sqlx::SqlitePool;

use crate::Result;

/// Register a token hash for a user, replacing any previous owner.
pub async fn insert_token(pool: &SqlitePool, token_hash: &str, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO auth_tokens (token_hash, user_id)
        VALUES (?, ?)
        ON CONFLICT(token_hash) DO UPDATE SET user_id = excluded.user_id
        "#,
    )
    .bind(token_hash)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Resolve a token hash to its user id.
pub async fn find_user_by_token_hash(pool: &SqlitePool, token_hash: &str) -> Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT user_id FROM auth_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|r| r.0))
}

/// Revoke a token. Returns true if it existed.
pub async fn revoke_token(pool: &SqlitePool, token_hash: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM auth_tokens WHERE token_hash = ?")
        .bind(token_hash)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
