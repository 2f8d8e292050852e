//! The in-memory view of a coaching session.

use std::collections::BTreeMap;

use coach_core::ChatMessage;
use database::CoachingSessionRow;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{CoachError, Result};
use crate::stage::SessionState;

/// One user's walk through a coach's stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachingSession {
    pub id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub coach_key: String,
    /// Every turn sent to or received from the model, oldest first.
    pub messages: Vec<ChatMessage>,
    pub state: SessionState,
    pub event_summary: Option<String>,
    /// Insight recorded when each coaching stage was completed.
    pub insights: BTreeMap<u8, String>,
    pub source: String,
    pub metadata: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

impl CoachingSession {
    /// A fresh session at intake with new ids.
    pub fn new(
        user_id: &str,
        coach_key: &str,
        source: &str,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            conversation_id: Uuid::new_v4().to_string(),
            coach_key: coach_key.to_string(),
            messages: Vec::new(),
            state: SessionState::Intake,
            event_summary: None,
            insights: BTreeMap::new(),
            source: source.to_string(),
            metadata,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    pub fn current_stage(&self) -> u8 {
        self.state.current_stage()
    }

    /// Assessment pattern key and display name stored at creation, if any.
    pub fn pattern(&self) -> Option<(String, String)> {
        let pattern = self.metadata.get("pattern")?.as_str()?.to_string();
        let name = self
            .metadata
            .get("patternName")
            .and_then(|v| v.as_str())
            .unwrap_or(&pattern)
            .to_string();
        Some((pattern, name))
    }

    /// Decode a stored row.
    pub fn from_row(row: CoachingSessionRow) -> Result<Self> {
        let corrupt = |reason: String| CoachError::CorruptSession {
            id: row.id.clone(),
            reason,
        };

        let state = SessionState::from_parts(
            row.current_stage,
            row.rounds_in_stage,
            row.status == "completed",
        )
        .map_err(|e| corrupt(e.to_string()))?;

        let messages: Vec<ChatMessage> = serde_json::from_str(&row.messages)
            .map_err(|e| corrupt(format!("messages: {e}")))?;

        let raw_insights: BTreeMap<String, String> = serde_json::from_str(&row.insights)
            .map_err(|e| corrupt(format!("insights: {e}")))?;
        let mut insights = BTreeMap::new();
        for (key, value) in raw_insights {
            let stage: u8 = key
                .parse()
                .map_err(|_| corrupt(format!("insight key {key}")))?;
            insights.insert(stage, value);
        }

        let metadata = serde_json::from_str(&row.metadata)
            .map_err(|e| corrupt(format!("metadata: {e}")))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            conversation_id: row.conversation_id,
            coach_key: row.coach_key,
            messages,
            state,
            event_summary: row.event_summary,
            insights,
            source: row.source,
            metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// Encode for storage.
    pub fn to_row(&self) -> CoachingSessionRow {
        let insights: BTreeMap<String, &String> = self
            .insights
            .iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        CoachingSessionRow {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            conversation_id: self.conversation_id.clone(),
            coach_key: self.coach_key.clone(),
            current_stage: i64::from(self.state.current_stage()),
            rounds_in_stage: i64::from(self.state.rounds()),
            status: self.state.status().to_string(),
            messages: serde_json::to_string(&self.messages).unwrap_or_else(|_| "[]".to_string()),
            event_summary: self.event_summary.clone(),
            insights: serde_json::to_string(&insights).unwrap_or_else(|_| "{}".to_string()),
            source: self.source.clone(),
            metadata: self.metadata.to_string(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_core::ToolCall;

    #[test]
    fn test_row_round_trip() {
        let mut session = CoachingSession::new(
            "u1",
            "emotion_coach",
            "assessment",
            serde_json::json!({"pattern": "anxiety", "patternName": "Anxious"}),
        );
        session.state = SessionState::Stage {
            number: 3,
            rounds: 2,
        };
        session.event_summary = Some("exam".to_string());
        session.insights.insert(1, "named it".to_string());
        session.insights.insert(2, "need rest".to_string());
        session.messages.push(ChatMessage::user("hi"));
        session.messages.push(ChatMessage::assistant_with_tools(
            "",
            vec![ToolCall::function("c1", "complete_stage", "{}")],
        ));
        session.messages.push(ChatMessage::tool_result("c1", "{\"success\":true}"));

        let row = session.to_row();
        assert_eq!(row.current_stage, 3);
        assert_eq!(row.rounds_in_stage, 2);
        assert_eq!(row.status, "active");
        assert_eq!(row.insights, r#"{"1":"named it","2":"need rest"}"#);

        let decoded = CoachingSession::from_row(row).unwrap();
        assert_eq!(decoded, session);
    }

    #[test]
    fn test_pattern_from_metadata() {
        let session = CoachingSession::new(
            "u1",
            "emotion_coach",
            "assessment",
            serde_json::json!({"pattern": "numbness"}),
        );
        assert_eq!(
            session.pattern(),
            Some(("numbness".to_string(), "numbness".to_string()))
        );

        let plain = CoachingSession::new("u1", "emotion_coach", "direct", serde_json::json!({}));
        assert!(plain.pattern().is_none());
    }

    #[test]
    fn test_corrupt_rows() {
        let session = CoachingSession::new("u1", "k", "direct", serde_json::json!({}));

        let mut row = session.to_row();
        row.messages = "not json".to_string();
        assert!(matches!(
            CoachingSession::from_row(row),
            Err(CoachError::CorruptSession { .. })
        ));

        let mut row = session.to_row();
        row.current_stage = 9;
        assert!(matches!(
            CoachingSession::from_row(row),
            Err(CoachError::CorruptSession { .. })
        ));

        let mut row = session.to_row();
        row.insights = r#"{"one":"x"}"#.to_string();
        assert!(matches!(
            CoachingSession::from_row(row),
            Err(CoachError::CorruptSession { .. })
        ));
    }
}
