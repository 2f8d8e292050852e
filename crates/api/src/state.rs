//! Application state shared across handlers.

use std::sync::Arc;

use coach_core::ChatClient;
use coaching::{Coach, CoachConfig, SqliteSessionStore};
use database::Database;
use wechat::MsgCrypt;

use crate::error::ApiError;

/// The coach as wired into the API.
pub type ApiCoach = Coach<Arc<dyn ChatClient>, SqliteSessionStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Completion client, absent when the gateway is not configured.
    pub chat: Option<Arc<dyn ChatClient>>,
    /// Coaching controller, present whenever `chat` is.
    pub coach: Option<Arc<ApiCoach>>,
    /// WeChat callback crypto, absent when WeChat is not configured.
    pub wechat: Option<Arc<MsgCrypt>>,
    /// Lifetime of QR login attempts.
    pub login_ttl_secs: i64,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        db: Database,
        chat: Option<Arc<dyn ChatClient>>,
        coach_config: CoachConfig,
        wechat: Option<MsgCrypt>,
        login_ttl_secs: i64,
    ) -> Self {
        let coach = chat.as_ref().map(|client| {
            Arc::new(Coach::new(
                client.clone(),
                SqliteSessionStore::new(db.clone()),
                db.clone(),
                coach_config,
            ))
        });

        Self {
            db,
            chat,
            coach,
            wechat: wechat.map(Arc::new),
            login_ttl_secs,
        }
    }

    /// The coach, or 503 when the model gateway is not configured.
    pub fn coach(&self) -> Result<&ApiCoach, ApiError> {
        self.coach.as_deref().ok_or_else(|| {
            ApiError::ServiceUnavailable("AI coach is not configured".to_string())
        })
    }
}
