//! Coaching endpoints.

use std::convert::Infallible;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use coaching::{Briefing, CoachReply, NewSessionRequest, ToolCallSummary, ASSESSMENT_SOURCE};
use database::briefing as briefing_rows;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Characters per streamed content chunk.
const STREAM_CHUNK_CHARS: usize = 24;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: String,
    /// `"create_session"` creates a session instead of sending a message.
    pub action: Option<String>,
    /// Session source; defaults to "assessment" when a pattern is given.
    pub source: Option<String>,
    pub pattern: Option<String>,
    pub pattern_name: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

/// `POST /coach/:coach_key/messages`
pub async fn post_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(coach_key): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Response> {
    let coach = state.coach()?;

    if request.action.as_deref() == Some("create_session") {
        let source = request.source.unwrap_or_else(|| {
            if request.pattern.is_some() {
                ASSESSMENT_SOURCE.to_string()
            } else {
                "direct".to_string()
            }
        });
        let handle = coach
            .create_session(
                &user_id,
                &coach_key,
                NewSessionRequest {
                    source,
                    pattern: request.pattern,
                    pattern_name: request.pattern_name,
                },
            )
            .await?;
        return Ok(Json(handle).into_response());
    }

    if let Some(action) = request.action.as_deref() {
        return Err(ApiError::BadRequest(format!("Unknown action: {action}")));
    }

    let reply = coach
        .handle_message(
            &user_id,
            &coach_key,
            request.session_id.as_deref(),
            &request.message,
        )
        .await?;

    info!(
        "Coach {} replied at stage {} for {}",
        coach_key, reply.current_stage, user_id
    );

    if request.stream {
        return Ok(Sse::new(stream_reply(&coach_key, reply)).into_response());
    }
    Ok(Json(reply).into_response())
}

/// `GET /coach/sessions/:session_id`
pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(session_id): Path<String>,
) -> Result<Response> {
    let session = state.coach()?.session(&user_id, &session_id).await?;
    Ok(Json(session).into_response())
}

/// `GET /coach/sessions/:session_id/briefing`
pub async fn get_briefing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<Briefing>> {
    let briefing = state.coach()?.briefing(&user_id, &session_id).await?;
    Ok(Json(briefing))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingEntry {
    pub session_id: String,
    pub created_at: String,
    pub briefing: Briefing,
}

/// `GET /coach/briefings`: the caller's briefings, newest first.
pub async fn list_briefings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BriefingEntry>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let rows = briefing_rows::list_briefings_for_user(state.db.pool(), &user_id, limit).await?;

    Ok(Json(
        rows.iter()
            .map(|row| BriefingEntry {
                session_id: row.session_id.clone(),
                created_at: row.created_at.clone(),
                briefing: Briefing::from_row(row),
            })
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
struct ChatCompletionChunk<'a> {
    id: &'a str,
    object: &'static str,
    created: u64,
    model: &'a str,
    choices: Vec<ChatChoiceChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_stage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call: Option<&'a ToolCallSummary>,
}

#[derive(Debug, Serialize)]
struct ChatChoiceChunk {
    index: u32,
    delta: serde_json::Value,
    finish_reason: Option<&'static str>,
}

/// Deliver a finished reply as chat-completion chunks followed by `[DONE]`.
///
/// The last chunk carries the stage and tool call of the turn.
fn stream_reply(
    coach_key: &str,
    reply: CoachReply,
) -> impl tokio_stream::Stream<Item = std::result::Result<Event, Infallible>> {
    let id = format!("chatcmpl-{}", Uuid::new_v4());
    let created = unix_timestamp();

    let chars: Vec<char> = reply.content.chars().collect();
    let mut events = Vec::new();

    for (index, piece) in chars.chunks(STREAM_CHUNK_CHARS).enumerate() {
        let text: String = piece.iter().collect();
        let delta = if index == 0 {
            serde_json::json!({ "role": "assistant", "content": text })
        } else {
            serde_json::json!({ "content": text })
        };
        events.push(chunk_event(&ChatCompletionChunk {
            id: &id,
            object: "chat.completion.chunk",
            created,
            model: coach_key,
            choices: vec![ChatChoiceChunk {
                index: 0,
                delta,
                finish_reason: None,
            }],
            current_stage: None,
            tool_call: None,
        }));
    }

    events.push(chunk_event(&ChatCompletionChunk {
        id: &id,
        object: "chat.completion.chunk",
        created,
        model: coach_key,
        choices: vec![ChatChoiceChunk {
            index: 0,
            delta: serde_json::json!({}),
            finish_reason: Some("stop"),
        }],
        current_stage: Some(reply.current_stage),
        tool_call: reply.tool_call.as_ref(),
    }));
    events.push(Event::default().data("[DONE]"));

    tokio_stream::iter(events.into_iter().map(Ok))
}

fn chunk_event(chunk: &ChatCompletionChunk<'_>) -> Event {
    Event::default().data(serde_json::to_string(chunk).unwrap_or_default())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
