//! The end-of-session briefing.

use std::collections::BTreeMap;

use database::BriefingRow;
use serde::{Deserialize, Serialize};

use crate::session::CoachingSession;

/// Reply text used when the model finishes without any text of its own.
pub const DEFAULT_BRIEFING_TEXT: &str =
    "Wonderful! You've completed today's four emotional steps 🌿";

/// Summary of a finished session, with the same fields the
/// `generate_briefing` tool takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Briefing {
    pub emotion_theme: String,
    pub emotion_tags: Vec<String>,
    pub stage_1_content: String,
    pub stage_2_content: String,
    pub stage_3_content: String,
    pub stage_4_content: String,
    pub insight: String,
    pub action: String,
    pub growth_story: String,
}

impl Briefing {
    /// Synthesise a briefing from what the session recorded, for sessions that
    /// reached the briefing stage without the model producing one.
    pub fn fallback(event_summary: Option<&str>, insights: &BTreeMap<u8, String>) -> Self {
        let stage = |n: u8, default: &str| {
            insights
                .get(&n)
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            emotion_theme: event_summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("Emotional exploration and growth")
                .to_string(),
            emotion_tags: vec![
                "emotional awareness".to_string(),
                "self growth".to_string(),
                "inner strength".to_string(),
            ],
            stage_1_content: stage(1, "Noticed my emotions and let my feelings be seen"),
            stage_2_content: stage(2, "Understood the needs and longings behind the emotion"),
            stage_3_content: stage(3, "Saw my habitual reaction pattern"),
            stage_4_content: stage(4, "Found a new way to respond and a small action"),
            insight: "Today you bravely faced your emotions, and every step was growth."
                .to_string(),
            action: "Take three deep breaths and say something kind to yourself.".to_string(),
            growth_story: "Keep treating yourself gently. 🌿".to_string(),
        }
    }

    /// The row stored for this briefing.
    pub fn to_row(&self, id: &str, session: &CoachingSession) -> BriefingRow {
        BriefingRow {
            id: id.to_string(),
            session_id: session.id.clone(),
            conversation_id: session.conversation_id.clone(),
            user_id: session.user_id.clone(),
            emotion_theme: self.emotion_theme.clone(),
            emotion_tags: serde_json::to_string(&self.emotion_tags)
                .unwrap_or_else(|_| "[]".to_string()),
            stage_1_content: self.stage_1_content.clone(),
            stage_2_content: self.stage_2_content.clone(),
            stage_3_content: self.stage_3_content.clone(),
            stage_4_content: self.stage_4_content.clone(),
            insight: self.insight.clone(),
            action: self.action.clone(),
            growth_story: self.growth_story.clone(),
            created_at: String::new(),
        }
    }

    /// Rebuild a briefing from its stored row.
    pub fn from_row(row: &BriefingRow) -> Self {
        Self {
            emotion_theme: row.emotion_theme.clone(),
            emotion_tags: serde_json::from_str(&row.emotion_tags).unwrap_or_default(),
            stage_1_content: row.stage_1_content.clone(),
            stage_2_content: row.stage_2_content.clone(),
            stage_3_content: row.stage_3_content.clone(),
            stage_4_content: row.stage_4_content.clone(),
            insight: row.insight.clone(),
            action: row.action.clone(),
            growth_story: row.growth_story.clone(),
        }
    }
}
