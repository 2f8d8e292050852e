//! WeChat bridge tables: openid mappings, inbound audit log, QR login attempts.

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DatabaseError;
use crate::models::{WechatInboundMessage, WechatLoginAttempt, WechatUserMapping};
use crate::Result;

/// Get the mapping for an openid.
pub async fn get_mapping(pool: &SqlitePool, openid: &str) -> Result<Option<WechatUserMapping>> {
    let row = sqlx::query_as::<_, WechatUserMapping>(
        r#"
        SELECT openid, user_id, subscribed, created_at, updated_at
        FROM wechat_user_mappings
        WHERE openid = ?
        "#,
    )
    .bind(openid)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Make sure an openid has a mapping row and record its subscription state.
pub async fn upsert_mapping(pool: &SqlitePool, openid: &str, subscribed: bool) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wechat_user_mappings (openid, subscribed)
        VALUES (?, ?)
        ON CONFLICT(openid) DO UPDATE SET
            subscribed = excluded.subscribed,
            updated_at = datetime('now')
        "#,
    )
    .bind(openid)
    .bind(subscribed)
    .execute(pool)
    .await?;

    Ok(())
}

/// Bind an openid to an account, creating the mapping row if needed.
async fn link_user(tx: &mut Transaction<'_, Sqlite>, openid: &str, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wechat_user_mappings (openid, user_id)
        VALUES (?, ?)
        ON CONFLICT(openid) DO UPDATE SET
            user_id = excluded.user_id,
            updated_at = datetime('now')
        "#,
    )
    .bind(openid)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Fields of an inbound message worth keeping.
#[derive(Debug, Clone, Copy)]
pub struct InboundRecord<'a> {
    pub openid: &'a str,
    pub user_id: Option<&'a str>,
    pub msg_type: &'a str,
    pub event: Option<&'a str>,
    pub content: Option<&'a str>,
    pub raw_xml: &'a str,
}

/// Append a decrypted inbound message to the audit log.
pub async fn record_inbound(pool: &SqlitePool, record: InboundRecord<'_>) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO wechat_inbound_messages (openid, user_id, msg_type, event, content, raw_xml)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.openid)
    .bind(record.user_id)
    .bind(record.msg_type)
    .bind(record.event)
    .bind(record.content)
    .bind(record.raw_xml)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// List the newest inbound messages for an openid.
pub async fn list_inbound(
    pool: &SqlitePool,
    openid: &str,
    limit: i64,
) -> Result<Vec<WechatInboundMessage>> {
    let rows = sqlx::query_as::<_, WechatInboundMessage>(
        r#"
        SELECT id, openid, user_id, msg_type, event, content, raw_xml, created_at
        FROM wechat_inbound_messages
        WHERE openid = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(openid)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Create a pending login attempt that expires after `ttl_secs`.
pub async fn create_login_attempt(pool: &SqlitePool, scene: &str, ttl_secs: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO wechat_login_attempts (scene, expires_at)
        VALUES (?, datetime('now', ?))
        ON CONFLICT(scene) DO NOTHING
        "#,
    )
    .bind(scene)
    .bind(format!("{:+} seconds", ttl_secs))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::AlreadyExists {
            entity: "login attempt",
            id: scene.to_string(),
        });
    }

    Ok(())
}

/// Get a login attempt. Unfinished attempts past their deadline read as "expired".
pub async fn get_login_attempt(pool: &SqlitePool, scene: &str) -> Result<WechatLoginAttempt> {
    sqlx::query_as::<_, WechatLoginAttempt>(
        r#"
        SELECT scene,
               CASE
                   WHEN status IN ('pending', 'scanned') AND expires_at <= datetime('now')
                   THEN 'expired'
                   ELSE status
               END AS status,
               openid, user_id, expires_at, created_at, updated_at
        FROM wechat_login_attempts
        WHERE scene = ?
        "#,
    )
    .bind(scene)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "login attempt",
        id: scene.to_string(),
    })
}

/// Record that the QR code for `scene` was scanned by `openid`.
///
/// The attempt becomes "confirmed" when the openid is already bound to an
/// account, "scanned" otherwise. Returns false when there is no live attempt
/// for the scene.
pub async fn mark_login_scanned(
    pool: &SqlitePool,
    scene: &str,
    openid: &str,
    user_id: Option<&str>,
) -> Result<bool> {
    let status = if user_id.is_some() { "confirmed" } else { "scanned" };

    let result = sqlx::query(
        r#"
        UPDATE wechat_login_attempts SET
            status = ?,
            openid = ?,
            user_id = ?,
            updated_at = datetime('now')
        WHERE scene = ?
          AND status IN ('pending', 'scanned')
          AND expires_at > datetime('now')
        "#,
    )
    .bind(status)
    .bind(openid)
    .bind(user_id)
    .bind(scene)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Confirm a scanned login for `user_id`.
///
/// The openid that scanned the code is bound to the account, so later scans
/// by it confirm straight away. Only a live "scanned" attempt can be
/// confirmed; returns false otherwise.
pub async fn confirm_login(pool: &SqlitePool, scene: &str, user_id: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let scanned: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT openid
        FROM wechat_login_attempts
        WHERE scene = ?
          AND status = 'scanned'
          AND openid IS NOT NULL
          AND expires_at > datetime('now')
        "#,
    )
    .bind(scene)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((openid,)) = scanned else {
        return Ok(false);
    };

    link_user(&mut tx, &openid, user_id).await?;

    sqlx::query(
        r#"
        UPDATE wechat_login_attempts SET
            status = 'confirmed',
            user_id = ?,
            updated_at = datetime('now')
        WHERE scene = ?
        "#,
    )
    .bind(user_id)
    .bind(scene)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}
