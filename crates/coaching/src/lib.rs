//! Staged coaching dialogue controller.
//!
//! A coaching session walks the user through an intake, four coaching stages
//! (awareness, understanding, reaction, transformation) and a closing
//! briefing. Each user turn is one call to the completion model with three
//! tools offered; the model moves the session forward by calling them.
//!
//! # Architecture
//!
//! ```text
//! user message
//!      ↓
//! ┌──────────────────────────────────────────────────────┐
//! │                        COACH                         │
//! │                                                      │
//! │  1. Load session (or create one) and its template    │
//! │  2. Build the stage prompt from rounds so far        │
//! │  3. Call the model with the coach tools              │
//! │         ↓                                            │
//! │     text            → save turn, reply               │
//! │     capture_emotion → stage 1, continuation call     │
//! │     complete_stage  → next stage, continuation call  │
//! │     generate_briefing → store briefing, complete     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use coaching::{Coach, CoachConfig, SqliteSessionStore, DEFAULT_COACH_KEY};
//!
//! let store = SqliteSessionStore::new(db.clone());
//! let coach = Coach::new(client, store, db, CoachConfig::from_env());
//!
//! let reply = coach
//!     .handle_message("user-1", DEFAULT_COACH_KEY, None, "I snapped at my sister")
//!     .await?;
//! println!("[{}] {}", reply.current_stage, reply.content);
//! ```

pub mod briefing;
pub mod coach;
pub mod error;
pub mod persona;
pub mod prompt;
pub mod session;
pub mod stage;
pub mod store;
pub mod templates;
pub mod tools;

pub use briefing::{Briefing, DEFAULT_BRIEFING_TEXT};
pub use coach::{
    Coach, CoachConfig, CoachReply, NewSessionRequest, SessionHandle, ToolCallSummary,
    ASSESSMENT_SOURCE, DEFAULT_CONTINUE_TEXT, QUOTA_EXHAUSTED_MESSAGE,
};
pub use error::{CoachError, MalformedToolCall, Result, TemplateError, TransitionError};
pub use persona::Companion;
pub use prompt::{build_stage_prompt, build_system_prompt, PromptContext};
pub use session::CoachingSession;
pub use stage::{SessionEvent, SessionState, BRIEFING_STAGE, COACHING_STAGES};
pub use store::{NewSession, SessionStore, SqliteSessionStore};
pub use templates::{
    load_templates, seed_template, StageTemplates, TemplateFile, DEFAULT_COACH_KEY,
    DEFAULT_TEMPLATE_JSON,
};
pub use tools::{coach_tools, CoachToolCall, CAPTURE_EMOTION, COMPLETE_STAGE, GENERATE_BRIEFING};
