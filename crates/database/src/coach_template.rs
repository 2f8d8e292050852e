//! Coach template storage.

use sqlx::SqlitePool;

use crate::error::DatabaseError;
use crate::models::CoachTemplate;
use crate::Result;

/// Get the active template for a coach key.
pub async fn get_active_template(pool: &SqlitePool, coach_key: &str) -> Result<CoachTemplate> {
    sqlx::query_as::<_, CoachTemplate>(
        r#"
        SELECT coach_key, title, system_prompt, stage_prompts, is_active, updated_at
        FROM coach_templates
        WHERE coach_key = ? AND is_active = 1
        "#,
    )
    .bind(coach_key)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "coach template",
        id: coach_key.to_string(),
    })
}

/// Insert or replace a template.
pub async fn upsert_template(
    pool: &SqlitePool,
    coach_key: &str,
    title: &str,
    system_prompt: &str,
    stage_prompts: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO coach_templates (coach_key, title, system_prompt, stage_prompts)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(coach_key) DO UPDATE SET
            title = excluded.title,
            system_prompt = excluded.system_prompt,
            stage_prompts = excluded.stage_prompts,
            is_active = 1,
            updated_at = datetime('now')
        "#,
    )
    .bind(coach_key)
    .bind(title)
    .bind(system_prompt)
    .bind(stage_prompts)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = Database::connect_in_memory().await.unwrap();
        upsert_template(db.pool(), "emotion_coach", "Emotion", "base", r#"{"stages":{}}"#)
            .await
            .unwrap();

        let template = get_active_template(db.pool(), "emotion_coach").await.unwrap();
        assert_eq!(template.title, "Emotion");
        assert_eq!(template.system_prompt, "base");
        assert!(template.is_active);

        upsert_template(db.pool(), "emotion_coach", "Emotion v2", "base2", "{}")
            .await
            .unwrap();
        let template = get_active_template(db.pool(), "emotion_coach").await.unwrap();
        assert_eq!(template.title, "Emotion v2");
    }

    #[tokio::test]
    async fn test_inactive_template_is_not_found() {
        let db = Database::connect_in_memory().await.unwrap();
        upsert_template(db.pool(), "old", "Old", "base", "{}").await.unwrap();

        sqlx::query("UPDATE coach_templates SET is_active = 0 WHERE coach_key = ?")
            .bind("old")
            .execute(db.pool())
            .await
            .unwrap();
        let result = get_active_template(db.pool(), "old").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
