//! Coaching session and conversation persistence.

use sqlx::SqlitePool;

use crate::briefing::insert_briefing;
use crate::error::DatabaseError;
use crate::models::{BriefingRow, CoachingSessionRow};
use crate::Result;

const SESSION_COLUMNS: &str = "id, user_id, conversation_id, coach_key, current_stage, \
     rounds_in_stage, status, messages, event_summary, insights, source, metadata, \
     created_at, updated_at";

/// Insert a new session together with its conversation row.
///
/// The conversation id and owner are taken from the session row.
pub async fn create_session(pool: &SqlitePool, session: &CoachingSessionRow) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO conversations (id, user_id, coach_key)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&session.conversation_id)
    .bind(&session.user_id)
    .bind(&session.coach_key)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO coaching_sessions (
            id, user_id, conversation_id, coach_key, current_stage, rounds_in_stage,
            status, messages, event_summary, insights, source, metadata
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.conversation_id)
    .bind(&session.coach_key)
    .bind(session.current_stage)
    .bind(session.rounds_in_stage)
    .bind(&session.status)
    .bind(&session.messages)
    .bind(&session.event_summary)
    .bind(&session.insights)
    .bind(&session.source)
    .bind(&session.metadata)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!("Created coaching session {}", session.id);
    Ok(())
}

/// Get a session by id.
pub async fn get_session(pool: &SqlitePool, id: &str) -> Result<CoachingSessionRow> {
    let query = format!("SELECT {SESSION_COLUMNS} FROM coaching_sessions WHERE id = ?");
    sqlx::query_as::<_, CoachingSessionRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "coaching session",
            id: id.to_string(),
        })
}

/// Overwrite the mutable columns of a session.
///
/// Whole-row write, last write wins.
pub async fn update_session(pool: &SqlitePool, session: &CoachingSessionRow) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE coaching_sessions SET
            current_stage = ?,
            rounds_in_stage = ?,
            status = ?,
            messages = ?,
            event_summary = ?,
            insights = ?,
            metadata = ?,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(session.current_stage)
    .bind(session.rounds_in_stage)
    .bind(&session.status)
    .bind(&session.messages)
    .bind(&session.event_summary)
    .bind(&session.insights)
    .bind(&session.metadata)
    .bind(&session.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "coaching session",
            id: session.id.clone(),
        });
    }

    Ok(())
}

/// Write the final session row and its briefing in one transaction.
///
/// Fails with `AlreadyExists` if the session already has a briefing; in that
/// case nothing is written.
pub async fn complete_session(
    pool: &SqlitePool,
    session: &CoachingSessionRow,
    briefing: &BriefingRow,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let existing: Option<(String,)> =
        sqlx::query_as("SELECT id FROM briefings WHERE session_id = ?")
            .bind(&session.id)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_some() {
        return Err(DatabaseError::AlreadyExists {
            entity: "briefing",
            id: session.id.clone(),
        });
    }

    sqlx::query(
        r#"
        UPDATE coaching_sessions SET
            current_stage = ?,
            rounds_in_stage = ?,
            status = ?,
            messages = ?,
            event_summary = ?,
            insights = ?,
            metadata = ?,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(session.current_stage)
    .bind(session.rounds_in_stage)
    .bind(&session.status)
    .bind(&session.messages)
    .bind(&session.event_summary)
    .bind(&session.insights)
    .bind(&session.metadata)
    .bind(&session.id)
    .execute(&mut *tx)
    .await?;

    insert_briefing(&mut tx, briefing).await?;

    tx.commit().await?;

    tracing::info!("Session {} completed with briefing {}", session.id, briefing.id);
    Ok(())
}

/// Count a user's completed sessions from one source.
pub async fn count_completed_sessions(
    pool: &SqlitePool,
    user_id: &str,
    source: &str,
) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM coaching_sessions
        WHERE user_id = ? AND source = ? AND status = 'completed'
        "#,
    )
    .bind(user_id)
    .bind(source)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{briefing, Database};

    fn sample_session(id: &str, user_id: &str) -> CoachingSessionRow {
        CoachingSessionRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            conversation_id: format!("conv-{id}"),
            coach_key: "emotion_coach".to_string(),
            current_stage: 0,
            rounds_in_stage: 0,
            status: "active".to_string(),
            messages: "[]".to_string(),
            event_summary: None,
            insights: "{}".to_string(),
            source: "direct".to_string(),
            metadata: "{}".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn sample_briefing(session: &CoachingSessionRow) -> BriefingRow {
        BriefingRow {
            id: format!("brief-{}", session.id),
            session_id: session.id.clone(),
            conversation_id: session.conversation_id.clone(),
            user_id: session.user_id.clone(),
            emotion_theme: "Exam anxiety".to_string(),
            emotion_tags: r#"["anxiety"]"#.to_string(),
            stage_1_content: "named it".to_string(),
            stage_2_content: "understood it".to_string(),
            stage_3_content: "noticed reactions".to_string(),
            stage_4_content: "chose a step".to_string(),
            insight: "It is okay".to_string(),
            action: "Walk daily".to_string(),
            growth_story: "I grew".to_string(),
            created_at: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let db = Database::connect_in_memory().await.unwrap();
        let session = sample_session("s1", "u1");
        create_session(db.pool(), &session).await.unwrap();

        let fetched = get_session(db.pool(), "s1").await.unwrap();
        assert_eq!(fetched.user_id, "u1");
        assert_eq!(fetched.current_stage, 0);
        assert_eq!(fetched.status, "active");
        assert!(!fetched.created_at.is_empty());

        let (user_id, coach_key): (String, String) =
            sqlx::query_as("SELECT user_id, coach_key FROM conversations WHERE id = ?")
                .bind("conv-s1")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(user_id, "u1");
        assert_eq!(coach_key, "emotion_coach");
    }

    #[tokio::test]
    async fn test_get_missing_session() {
        let db = Database::connect_in_memory().await.unwrap();
        let result = get_session(db.pool(), "nope").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_session() {
        let db = Database::connect_in_memory().await.unwrap();
        let mut session = sample_session("s1", "u1");
        create_session(db.pool(), &session).await.unwrap();

        session.current_stage = 2;
        session.rounds_in_stage = 1;
        session.event_summary = Some("exam".to_string());
        session.insights = r#"{"1":"named"}"#.to_string();
        update_session(db.pool(), &session).await.unwrap();

        let fetched = get_session(db.pool(), "s1").await.unwrap();
        assert_eq!(fetched.current_stage, 2);
        assert_eq!(fetched.rounds_in_stage, 1);
        assert_eq!(fetched.event_summary.as_deref(), Some("exam"));
        assert_eq!(fetched.insights, r#"{"1":"named"}"#);
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let db = Database::connect_in_memory().await.unwrap();
        let result = update_session(db.pool(), &sample_session("ghost", "u1")).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_complete_session_once() {
        let db = Database::connect_in_memory().await.unwrap();
        let mut session = sample_session("s1", "u1");
        session.source = "assessment".to_string();
        create_session(db.pool(), &session).await.unwrap();

        session.current_stage = 5;
        session.status = "completed".to_string();
        let brief = sample_briefing(&session);
        complete_session(db.pool(), &session, &brief).await.unwrap();

        let stored = briefing::get_briefing_by_session(db.pool(), "s1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.emotion_theme, "Exam anxiety");
        assert_eq!(
            count_completed_sessions(db.pool(), "u1", "assessment").await.unwrap(),
            1
        );

        // A second completion must not write anything
        let mut again = brief.clone();
        again.id = "brief-2".to_string();
        let result = complete_session(db.pool(), &session, &again).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_count_ignores_other_sources_and_active() {
        let db = Database::connect_in_memory().await.unwrap();
        create_session(db.pool(), &sample_session("s1", "u1")).await.unwrap();

        assert_eq!(
            count_completed_sessions(db.pool(), "u1", "assessment").await.unwrap(),
            0
        );
        assert_eq!(
            count_completed_sessions(db.pool(), "u1", "direct").await.unwrap(),
            0
        );
    }
}
