//! The coach: runs one user turn through the model and the session script.

use std::env;

use coach_core::{
    prompt_tag, ChatClient, ChatMessage, Completion, CompletionRequest, ToolCall, ToolDefinition,
};
use database::{coaching_session, entitlement, profile, validation, Database};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::briefing::{Briefing, DEFAULT_BRIEFING_TEXT};
use crate::error::{CoachError, Result, TransitionError};
use crate::persona::{Companion, DEFAULT_PATTERN};
use crate::prompt::{
    build_continuation_prompt, build_system_prompt, corrective_note, PromptContext,
};
use crate::session::CoachingSession;
use crate::stage::{SessionEvent, SessionState, BRIEFING_STAGE};
use crate::store::{NewSession, SessionStore};
use crate::templates::{load_templates, StageTemplates};
use crate::tools::{coach_tools, CoachToolCall, InterpretedCall, GENERATE_BRIEFING};

/// Source tag of sessions started from the emotional-health assessment.
pub const ASSESSMENT_SOURCE: &str = "assessment";

/// Reply used when the continuation call produced nothing usable.
pub const DEFAULT_CONTINUE_TEXT: &str = "Let's keep exploring how you feel 🌿";

/// Shown when the free assessment allowance is used up.
pub const QUOTA_EXHAUSTED_MESSAGE: &str = "You have already used your free AI emotion coach \
     briefing. Purchase a membership or a training camp to continue.";

/// Coach settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CoachConfig {
    /// Completed assessment sessions allowed without membership or camp.
    pub free_assessment_briefings: i64,
    /// Sampling temperature for every call.
    pub temperature: f32,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            free_assessment_briefings: 1,
            temperature: 0.7,
        }
    }
}

impl CoachConfig {
    /// Read settings from the environment.
    ///
    /// - `COACH_FREE_ASSESSMENT_BRIEFINGS` (default 1)
    /// - `COACH_TEMPERATURE` (default 0.7)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            free_assessment_briefings: env::var("COACH_FREE_ASSESSMENT_BRIEFINGS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.free_assessment_briefings),
            temperature: env::var("COACH_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
        }
    }
}

/// Options for an explicitly created session.
#[derive(Debug, Clone, Default)]
pub struct NewSessionRequest {
    /// "assessment", "direct", ...; empty means direct.
    pub source: String,
    pub pattern: Option<String>,
    pub pattern_name: Option<String>,
}

/// Ids of a newly created session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: String,
    pub conversation_id: String,
}

/// The tool the model called during a turn, as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallSummary {
    pub function: String,
    pub args: Value,
}

/// What the user sees after a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachReply {
    pub content: String,
    pub current_stage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallSummary>,
}

/// Staged coaching dialogue controller.
pub struct Coach<C: ChatClient, S: SessionStore> {
    client: C,
    store: S,
    db: Database,
    config: CoachConfig,
}

impl<C: ChatClient, S: SessionStore> Coach<C, S> {
    pub fn new(client: C, store: S, db: Database, config: CoachConfig) -> Self {
        info!("Coach ready with client {}", client.name());
        Self {
            client,
            store,
            db,
            config,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    /// Create a session explicitly.
    ///
    /// Assessment sessions are limited for users without a membership or a
    /// paid training camp.
    pub async fn create_session(
        &self,
        user_id: &str,
        coach_key: &str,
        request: NewSessionRequest,
    ) -> Result<SessionHandle> {
        validation::validate_coach_key(coach_key)
            .map_err(|e| CoachError::InvalidInput(e.to_string()))?;
        // Unknown or broken coaches fail here rather than on the first message
        load_templates(&self.db, coach_key).await?;

        let source = if request.source.is_empty() {
            "direct".to_string()
        } else {
            request.source
        };

        let mut metadata = serde_json::Map::new();
        if source == ASSESSMENT_SOURCE {
            self.check_assessment_quota(user_id).await?;

            let pattern = request
                .pattern
                .unwrap_or_else(|| DEFAULT_PATTERN.to_string());
            let pattern_name = request.pattern_name.unwrap_or_else(|| pattern.clone());
            metadata.insert("pattern".to_string(), Value::String(pattern));
            metadata.insert("patternName".to_string(), Value::String(pattern_name));
        }

        let session = self
            .store
            .create(
                user_id,
                NewSession {
                    coach_key: coach_key.to_string(),
                    source,
                    metadata: Value::Object(metadata),
                },
            )
            .await?;

        info!(
            "Created {} session {} for coach {}",
            session.source, session.id, coach_key
        );

        Ok(SessionHandle {
            session_id: session.id,
            conversation_id: session.conversation_id,
        })
    }

    async fn check_assessment_quota(&self, user_id: &str) -> Result<()> {
        let pool = self.db.pool();
        if entitlement::has_active_membership(pool, user_id).await?
            || entitlement::has_paid_camp(pool, user_id).await?
        {
            return Ok(());
        }

        let used =
            coaching_session::count_completed_sessions(pool, user_id, ASSESSMENT_SOURCE).await?;
        if used >= self.config.free_assessment_briefings {
            info!("Assessment quota exhausted for {} ({} used)", user_id, used);
            return Err(CoachError::QuotaExhausted {
                message: QUOTA_EXHAUSTED_MESSAGE.to_string(),
            });
        }

        Ok(())
    }

    /// A session snapshot, if it belongs to the user.
    pub async fn session(&self, user_id: &str, session_id: &str) -> Result<CoachingSession> {
        self.store.load(user_id, session_id).await
    }

    /// The briefing of a user's session.
    pub async fn briefing(&self, user_id: &str, session_id: &str) -> Result<Briefing> {
        self.store.load(user_id, session_id).await?;
        self.store
            .briefing(session_id)
            .await?
            .ok_or_else(|| CoachError::NotFound(format!("briefing for session {session_id}")))
    }

    /// Run one user message through the session.
    ///
    /// Without a session id a direct session is created for `coach_key`.
    pub async fn handle_message(
        &self,
        user_id: &str,
        coach_key: &str,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<CoachReply> {
        validation::validate_message(message)
            .map_err(|e| CoachError::InvalidInput(e.to_string()))?;

        let session = match session_id {
            Some(id) => self.store.load(user_id, id).await?,
            None => {
                validation::validate_coach_key(coach_key)
                    .map_err(|e| CoachError::InvalidInput(e.to_string()))?;
                load_templates(&self.db, coach_key).await?;
                self.store
                    .get_or_create(user_id, None, NewSession::direct(coach_key))
                    .await?
            }
        };

        if session.state.is_completed() {
            return Err(TransitionError::SessionCompleted.into());
        }

        let templates = load_templates(&self.db, &session.coach_key).await?;
        let ctx = self.prompt_context(user_id, &session).await?;
        let system_prompt = build_system_prompt(&templates, &session.state, &ctx);

        debug!(
            "Session {} stage {} rounds {} prompt {}",
            session.id,
            session.current_stage(),
            session.state.rounds(),
            prompt_tag(&system_prompt)
        );

        // Nothing is persisted until the model has produced a usable turn
        let mut working = session;
        working.messages.push(ChatMessage::user(message));
        working.state = working.state.apply(SessionEvent::UserTurn)?;

        let tools = coach_tools(&ctx.companion);
        let (completion, call) = self
            .complete_turn(&system_prompt, &working.messages, &tools)
            .await?;
        let text = completion.content.clone().filter(|t| !t.trim().is_empty());

        let Some((raw_call, call)) = call else {
            if working.state == SessionState::AwaitingBriefing {
                return self.finish_with_fallback(working, text).await;
            }
            let content = text.unwrap_or_default();
            working.messages.push(ChatMessage::assistant(content.clone()));
            self.store.save(&working).await?;
            return Ok(CoachReply {
                content,
                current_stage: working.current_stage(),
                tool_call: None,
            });
        };

        working.messages.push(ChatMessage::assistant_with_tools(
            text.clone().unwrap_or_default(),
            vec![raw_call],
        ));

        info!("Session {} tool call {}", working.id, call.tool.name());

        match call.tool {
            CoachToolCall::GenerateBriefing(ref briefing) => {
                self.store.complete(&mut working, briefing).await?;
                Ok(CoachReply {
                    content: text.unwrap_or_else(|| DEFAULT_BRIEFING_TEXT.to_string()),
                    current_stage: BRIEFING_STAGE,
                    tool_call: Some(ToolCallSummary {
                        function: GENERATE_BRIEFING.to_string(),
                        args: call.args,
                    }),
                })
            }
            CoachToolCall::CaptureEmotion { .. } | CoachToolCall::CompleteStage { .. } => {
                self.advance_and_continue(working, call, &templates, &ctx, &tools)
                    .await
            }
        }
    }

    /// One model call, with a single corrective retry when the tool arguments
    /// are unusable.
    async fn complete_turn(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<(Completion, Option<(ToolCall, InterpretedCall)>)> {
        let request = CompletionRequest::new(system_prompt, messages.to_vec())
            .with_tools(tools.to_vec())
            .with_temperature(self.config.temperature);
        let completion = self.client.complete(request).await?;

        let problem = match completion.first_tool_call() {
            None => return Ok((completion, None)),
            Some(raw) => match CoachToolCall::interpret(raw) {
                Ok(call) => {
                    let raw = raw.clone();
                    return Ok((completion, Some((raw, call))));
                }
                Err(problem) => problem,
            },
        };

        warn!("Malformed tool call, asking again: {}", problem);

        let retry_prompt = format!("{}{}", system_prompt, corrective_note(&problem.to_string()));
        let request = CompletionRequest::new(retry_prompt, messages.to_vec())
            .with_tools(tools.to_vec())
            .with_temperature(self.config.temperature);
        let retry = self.client.complete(request).await?;

        let call = match retry.first_tool_call() {
            None => None,
            Some(raw) => Some((raw.clone(), CoachToolCall::interpret(raw)?)),
        };
        Ok((retry, call))
    }

    /// Apply `capture_emotion` / `complete_stage`, persist, then ask the model
    /// to carry on in the new stage.
    async fn advance_and_continue(
        &self,
        mut working: CoachingSession,
        call: InterpretedCall,
        templates: &StageTemplates,
        ctx: &PromptContext,
        tools: &[ToolDefinition],
    ) -> Result<CoachReply> {
        let mut result = match call.args.as_object() {
            Some(fields) => fields.clone(),
            None => serde_json::Map::new(),
        };
        result.insert("success".to_string(), Value::Bool(true));
        working.messages.push(ChatMessage::tool_result(
            call.id.clone(),
            Value::Object(result).to_string(),
        ));

        match &call.tool {
            CoachToolCall::CaptureEmotion { event_summary } => {
                working.state = working.state.apply(SessionEvent::EmotionCaptured)?;
                working.event_summary = Some(event_summary.clone());
                self.store.save(&working).await?;
            }
            CoachToolCall::CompleteStage { stage, insight, .. } => {
                self.store.advance_stage(&mut working, *stage, insight).await?;
            }
            CoachToolCall::GenerateBriefing(_) => {}
        }

        info!(
            "Session {} now at stage {}",
            working.id,
            working.current_stage()
        );

        // The stage change above is committed even if this call fails
        let prompt = build_continuation_prompt(templates, working.current_stage(), &ctx.companion);
        let request = CompletionRequest::new(prompt, working.messages.clone())
            .with_tools(tools.to_vec())
            .with_temperature(self.config.temperature);
        let follow_up = self.client.complete(request).await?;

        let content = match follow_up.content.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(text) => text.to_string(),
            None => {
                if let Some(raw) = follow_up.first_tool_call() {
                    match CoachToolCall::interpret(raw) {
                        Ok(InterpretedCall {
                            tool: CoachToolCall::GenerateBriefing(briefing),
                            args,
                            ..
                        }) => {
                            working
                                .messages
                                .push(ChatMessage::assistant_with_tools("", vec![raw.clone()]));
                            self.store.complete(&mut working, &briefing).await?;
                            return Ok(CoachReply {
                                content: DEFAULT_BRIEFING_TEXT.to_string(),
                                current_stage: BRIEFING_STAGE,
                                tool_call: Some(ToolCallSummary {
                                    function: GENERATE_BRIEFING.to_string(),
                                    args,
                                }),
                            });
                        }
                        Ok(other) => {
                            debug!("Ignoring nested tool call {}", other.tool.name());
                        }
                        Err(e) => warn!("Ignoring malformed nested tool call: {}", e),
                    }
                }
                DEFAULT_CONTINUE_TEXT.to_string()
            }
        };

        working.messages.push(ChatMessage::assistant(content.clone()));
        self.store.save(&working).await?;

        Ok(CoachReply {
            content,
            current_stage: working.current_stage(),
            tool_call: Some(ToolCallSummary {
                function: call.tool.name().to_string(),
                args: call.args,
            }),
        })
    }

    /// Every stage is done but the model did not call `generate_briefing`:
    /// build the briefing from what the session recorded.
    async fn finish_with_fallback(
        &self,
        mut working: CoachingSession,
        text: Option<String>,
    ) -> Result<CoachReply> {
        let briefing = Briefing::fallback(working.event_summary.as_deref(), &working.insights);
        let content = text.unwrap_or_else(|| DEFAULT_BRIEFING_TEXT.to_string());

        info!("Session {} finished with a synthesised briefing", working.id);

        working.messages.push(ChatMessage::assistant(content.clone()));
        self.store.complete(&mut working, &briefing).await?;

        Ok(CoachReply {
            content,
            current_stage: BRIEFING_STAGE,
            tool_call: Some(ToolCallSummary {
                function: GENERATE_BRIEFING.to_string(),
                args: serde_json::to_value(&briefing).unwrap_or(Value::Null),
            }),
        })
    }

    async fn prompt_context(&self, user_id: &str, session: &CoachingSession) -> Result<PromptContext> {
        let profile = profile::get_profile(self.db.pool(), user_id).await?;
        let (user_name, companion_key) = match profile {
            Some(p) => (p.display_name, p.companion_type),
            None => (None, None),
        };

        let pattern = session.pattern().or_else(|| {
            (session.source == ASSESSMENT_SOURCE)
                .then(|| (DEFAULT_PATTERN.to_string(), DEFAULT_PATTERN.to_string()))
        });

        Ok(PromptContext {
            user_name: user_name.unwrap_or_default(),
            pattern,
            is_first_turn: session.messages.is_empty(),
            companion: Companion::from_key(companion_key.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_serialization() {
        let reply = CoachReply {
            content: "hi".to_string(),
            current_stage: 1,
            tool_call: None,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json, serde_json::json!({"content": "hi", "current_stage": 1}));

        let reply = CoachReply {
            tool_call: Some(ToolCallSummary {
                function: "capture_emotion".to_string(),
                args: serde_json::json!({"event_summary": "x"}),
            }),
            ..reply
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["tool_call"]["function"], "capture_emotion");
        assert_eq!(json["tool_call"]["args"]["event_summary"], "x");
    }

    #[test]
    fn test_session_handle_is_camel_case() {
        let handle = SessionHandle {
            session_id: "s".to_string(),
            conversation_id: "c".to_string(),
        };
        let json = serde_json::to_value(&handle).unwrap();
        assert_eq!(json, serde_json::json!({"sessionId": "s", "conversationId": "c"}));
    }

    #[test]
    fn test_config_defaults() {
        let config = CoachConfig::default();
        assert_eq!(config.free_assessment_briefings, 1);
        assert_eq!(config.temperature, 0.7);
    }
}
