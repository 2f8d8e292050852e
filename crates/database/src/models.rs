//! Database models.
//!
//! JSON columns (`messages`, `insights`, `metadata`, `emotion_tags`,
//! `stage_prompts`) are kept as raw text here; the coaching crate owns
//! their typed shape.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A staged coaching session row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CoachingSessionRow {
    /// Session UUID.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Conversation the turns belong to.
    pub conversation_id: String,
    /// Which coach template drives this session.
    pub coach_key: String,
    /// 0 = intake, 1..=4 coaching stages, 5 = briefing.
    pub current_stage: i64,
    /// User turns already taken in the current stage.
    pub rounds_in_stage: i64,
    /// "active" or "completed".
    pub status: String,
    /// JSON array of chat turns.
    pub messages: String,
    /// Short description of the triggering event.
    pub event_summary: Option<String>,
    /// JSON object mapping stage number to insight text.
    pub insights: String,
    /// Where the session came from ("direct", "assessment", ...).
    pub source: String,
    /// Free-form JSON (assessment pattern and similar).
    pub metadata: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored end-of-session briefing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BriefingRow {
    pub id: String,
    pub session_id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub emotion_theme: String,
    /// JSON array of tags.
    pub emotion_tags: String,
    pub stage_1_content: String,
    pub stage_2_content: String,
    pub stage_3_content: String,
    pub stage_4_content: String,
    pub insight: String,
    pub action: String,
    pub growth_story: String,
    pub created_at: String,
}

/// Prompt configuration for one coach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CoachTemplate {
    pub coach_key: String,
    pub title: String,
    /// Base system prompt.
    pub system_prompt: String,
    /// JSON document with per-stage prompts and optional round limits.
    pub stage_prompts: String,
    pub is_active: bool,
    pub updated_at: String,
}

/// Personal settings used to address the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: String,
    /// Name the coach uses for the user.
    pub display_name: Option<String>,
    /// Companion persona key (e.g. "hedgehog", "owl").
    pub companion_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Link between a WeChat openid and an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WechatUserMapping {
    pub openid: String,
    pub user_id: Option<String>,
    pub subscribed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A decrypted inbound WeChat message, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WechatInboundMessage {
    pub id: i64,
    pub openid: String,
    pub user_id: Option<String>,
    pub msg_type: String,
    pub event: Option<String>,
    pub content: Option<String>,
    pub raw_xml: String,
    pub created_at: String,
}

/// A QR-code login attempt identified by its scene string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WechatLoginAttempt {
    pub scene: String,
    /// "pending", "scanned", "confirmed" or "expired".
    pub status: String,
    pub openid: Option<String>,
    pub user_id: Option<String>,
    pub expires_at: String,
    pub created_at: String,
    pub updated_at: String,
}
