//! Briefing storage.

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::models::BriefingRow;
use crate::Result;

/// Insert a briefing inside an open transaction.
pub(crate) async fn insert_briefing(
    tx: &mut Transaction<'_, Sqlite>,
    briefing: &BriefingRow,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO briefings (
            id, session_id, conversation_id, user_id, emotion_theme, emotion_tags,
            stage_1_content, stage_2_content, stage_3_content, stage_4_content,
            insight, action, growth_story
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&briefing.id)
    .bind(&briefing.session_id)
    .bind(&briefing.conversation_id)
    .bind(&briefing.user_id)
    .bind(&briefing.emotion_theme)
    .bind(&briefing.emotion_tags)
    .bind(&briefing.stage_1_content)
    .bind(&briefing.stage_2_content)
    .bind(&briefing.stage_3_content)
    .bind(&briefing.stage_4_content)
    .bind(&briefing.insight)
    .bind(&briefing.action)
    .bind(&briefing.growth_story)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Get the briefing written for a session, if any.
pub async fn get_briefing_by_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Option<BriefingRow>> {
    let row = sqlx::query_as::<_, BriefingRow>(
        r#"
        SELECT id, session_id, conversation_id, user_id, emotion_theme, emotion_tags,
               stage_1_content, stage_2_content, stage_3_content, stage_4_content,
               insight, action, growth_story, created_at
        FROM briefings
        WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List a user's briefings, newest first.
pub async fn list_briefings_for_user(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<BriefingRow>> {
    let rows = sqlx::query_as::<_, BriefingRow>(
        r#"
        SELECT id, session_id, conversation_id, user_id, emotion_theme, emotion_tags,
               stage_1_content, stage_2_content, stage_3_content, stage_4_content,
               insight, action, growth_story, created_at
        FROM briefings
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coaching_session::{complete_session, create_session};
    use crate::models::CoachingSessionRow;
    use crate::Database;

    fn session(id: &str) -> CoachingSessionRow {
        CoachingSessionRow {
            id: id.to_string(),
            user_id: "u1".to_string(),
            conversation_id: format!("conv-{id}"),
            coach_key: "emotion_coach".to_string(),
            current_stage: 5,
            rounds_in_stage: 0,
            status: "completed".to_string(),
            messages: "[]".to_string(),
            event_summary: None,
            insights: "{}".to_string(),
            source: "direct".to_string(),
            metadata: "{}".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn briefing_for(session: &CoachingSessionRow, theme: &str) -> BriefingRow {
        BriefingRow {
            id: format!("b-{}", session.id),
            session_id: session.id.clone(),
            conversation_id: session.conversation_id.clone(),
            user_id: session.user_id.clone(),
            emotion_theme: theme.to_string(),
            emotion_tags: "[]".to_string(),
            stage_1_content: String::new(),
            stage_2_content: String::new(),
            stage_3_content: String::new(),
            stage_4_content: String::new(),
            insight: String::new(),
            action: String::new(),
            growth_story: String::new(),
            created_at: String::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_briefing() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(get_briefing_by_session(db.pool(), "s1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let db = Database::connect_in_memory().await.unwrap();
        for (id, theme) in [("s1", "first"), ("s2", "second")] {
            let s = session(id);
            create_session(db.pool(), &s).await.unwrap();
            complete_session(db.pool(), &s, &briefing_for(&s, theme))
                .await
                .unwrap();
        }

        let rows = list_briefings_for_user(db.pool(), "u1", 10).await.unwrap();
        assert_eq!(rows.len(), 2);

        let rows = list_briefings_for_user(db.pool(), "u1", 1).await.unwrap();
        assert_eq!(rows.len(), 1);

        assert!(list_briefings_for_user(db.pool(), "u2", 10)
            .await
            .unwrap()
            .is_empty());
    }
}
