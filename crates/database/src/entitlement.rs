//! Membership and training-camp lookups used for session quotas.

use sqlx::SqlitePool;

use crate::Result;

/// Whether the user holds a membership that is active and not expired.
pub async fn has_active_membership(pool: &SqlitePool, user_id: &str) -> Result<bool> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM memberships
        WHERE user_id = ?
          AND status = 'active'
          AND (expires_at IS NULL OR expires_at > datetime('now'))
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Whether the user has paid for any training camp.
pub async fn has_paid_camp(pool: &SqlitePool, user_id: &str) -> Result<bool> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM camp_purchases
        WHERE user_id = ? AND payment_status = 'completed'
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Record a membership. `expires_at` is a SQLite datetime string.
pub async fn insert_membership(
    pool: &SqlitePool,
    user_id: &str,
    package_key: &str,
    status: &str,
    expires_at: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO memberships (user_id, package_key, status, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(package_key)
    .bind(status)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a camp purchase.
pub async fn insert_camp_purchase(
    pool: &SqlitePool,
    user_id: &str,
    camp_type: &str,
    payment_status: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO camp_purchases (user_id, camp_type, payment_status)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(camp_type)
    .bind(payment_status)
    .execute(pool)
    .await?;

    Ok(())
}
