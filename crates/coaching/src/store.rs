//! Session persistence.

use async_trait::async_trait;
use coach_core::ChatMessage;
use database::{briefing, coaching_session, Database, DatabaseError};
use uuid::Uuid;

use crate::briefing::Briefing;
use crate::error::{CoachError, Result};
use crate::session::CoachingSession;
use crate::stage::SessionEvent;

/// What to record on a session created without an id.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub coach_key: String,
    pub source: String,
    pub metadata: serde_json::Value,
}

impl NewSession {
    /// A direct (non-assessment) session for a coach.
    pub fn direct(coach_key: impl Into<String>) -> Self {
        Self {
            coach_key: coach_key.into(),
            source: "direct".to_string(),
            metadata: serde_json::json!({}),
        }
    }
}

/// Storage for coaching sessions.
///
/// Writes are whole-session and last write wins; concurrent turns on one
/// session are not serialised.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session (and its conversation).
    async fn create(&self, user_id: &str, new: NewSession) -> Result<CoachingSession>;

    /// Load a session owned by `user_id`. Sessions of other users read as not found.
    async fn load(&self, user_id: &str, session_id: &str) -> Result<CoachingSession>;

    /// Persist the whole session.
    async fn save(&self, session: &CoachingSession) -> Result<()>;

    /// Mark the session completed and store its briefing, atomically.
    async fn complete(&self, session: &mut CoachingSession, briefing: &Briefing) -> Result<()>;

    /// The stored briefing of a session, if any.
    async fn briefing(&self, session_id: &str) -> Result<Option<Briefing>>;

    /// Load the given session, or create one when no id is supplied.
    async fn get_or_create(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        new: NewSession,
    ) -> Result<CoachingSession> {
        match session_id {
            Some(id) => self.load(user_id, id).await,
            None => self.create(user_id, new).await,
        }
    }

    /// Append one turn and persist.
    async fn append_turn(&self, session: &mut CoachingSession, turn: ChatMessage) -> Result<()> {
        session.messages.push(turn);
        self.save(session).await
    }

    /// Record a stage insight, move the stage forward and persist.
    ///
    /// The first insight recorded for a stage is kept when it is closed again.
    async fn advance_stage(
        &self,
        session: &mut CoachingSession,
        stage: u8,
        insight: &str,
    ) -> Result<()> {
        session.state = session.state.apply(SessionEvent::StageCompleted(stage))?;
        session
            .insights
            .entry(stage)
            .or_insert_with(|| insight.to_string());
        self.save(session).await
    }
}

/// SQLite-backed session store.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, user_id: &str, new: NewSession) -> Result<CoachingSession> {
        let session = CoachingSession::new(user_id, &new.coach_key, &new.source, new.metadata);
        coaching_session::create_session(self.db.pool(), &session.to_row()).await?;
        // Reload to pick up the database timestamps
        self.load(user_id, &session.id).await
    }

    async fn load(&self, user_id: &str, session_id: &str) -> Result<CoachingSession> {
        let row = match coaching_session::get_session(self.db.pool(), session_id).await {
            Ok(row) => row,
            Err(DatabaseError::NotFound { .. }) => {
                return Err(CoachError::NotFound(format!("session {session_id}")))
            }
            Err(e) => return Err(e.into()),
        };

        if row.user_id != user_id {
            return Err(CoachError::NotFound(format!("session {session_id}")));
        }

        CoachingSession::from_row(row)
    }

    async fn save(&self, session: &CoachingSession) -> Result<()> {
        coaching_session::update_session(self.db.pool(), &session.to_row()).await?;
        Ok(())
    }

    async fn complete(&self, session: &mut CoachingSession, briefing: &Briefing) -> Result<()> {
        let completed = session.state.apply(SessionEvent::BriefingGenerated)?;

        let mut finished = session.clone();
        finished.state = completed;
        let row = briefing.to_row(&Uuid::new_v4().to_string(), &finished);

        match coaching_session::complete_session(self.db.pool(), &finished.to_row(), &row).await {
            Ok(()) => {}
            Err(DatabaseError::AlreadyExists { .. }) => {
                return Err(crate::error::TransitionError::SessionCompleted.into())
            }
            Err(e) => return Err(e.into()),
        }

        *session = finished;
        Ok(())
    }

    async fn briefing(&self, session_id: &str) -> Result<Option<Briefing>> {
        let row = briefing::get_briefing_by_session(self.db.pool(), session_id).await?;
        Ok(row.as_ref().map(Briefing::from_row))
    }
}
