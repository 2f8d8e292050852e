//! WeChat official-account callback and QR login.
//!
//! A login goes pending → scanned (callback event) → confirmed (the signed-in
//! user claims the scene). An openid already bound to an account skips
//! straight to confirmed on scan.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use coach_core::{ChatMessage, CompletionRequest};
use database::wechat::{self as wechat_rows, InboundRecord};
use database::WechatLoginAttempt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wechat::{parse_fields, text_reply, InboundMessage, MsgCrypt, WechatEvent};

use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Persona for replies to plain WeChat messages.
const WECHAT_ASSISTANT_PROMPT: &str = "You are a friendly emotional-wellbeing assistant who helps \
     users notice and look after their emotions. Reply briefly and warmly.";

/// Used when the model answers without text.
const WECHAT_FALLBACK_REPLY: &str = "Thank you for your message!";

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub signature: Option<String>,
    pub msg_signature: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub nonce: String,
    pub echostr: Option<String>,
}

fn plain(status: StatusCode, body: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body.into(),
    )
        .into_response()
}

fn success() -> Response {
    plain(StatusCode::OK, "success")
}

fn crypt(state: &AppState) -> std::result::Result<&MsgCrypt, Response> {
    state.wechat.as_deref().ok_or_else(|| {
        warn!("WeChat callback hit but WeChat is not configured");
        plain(StatusCode::SERVICE_UNAVAILABLE, "WeChat callback not configured")
    })
}

/// `GET /wechat/callback`: server URL verification.
pub async fn verify_url(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
    let crypt = match crypt(&state) {
        Ok(crypt) => crypt,
        Err(response) => return response,
    };

    let signature = query.signature.as_deref().unwrap_or_default();
    if !crypt.verify_signature(signature, &query.timestamp, &query.nonce, None) {
        warn!("WeChat URL verification failed");
        return plain(StatusCode::FORBIDDEN, "Invalid signature");
    }

    info!("WeChat URL verification succeeded");
    plain(StatusCode::OK, query.echostr.unwrap_or_default())
}

/// `POST /wechat/callback`: an encrypted message or event.
pub async fn receive_message(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    body: String,
) -> Response {
    let crypt = match crypt(&state) {
        Ok(crypt) => crypt,
        Err(response) => return response,
    };

    let encrypted = match parse_fields(&body) {
        Ok(mut fields) => fields.remove("Encrypt"),
        Err(e) => {
            warn!("Unreadable WeChat envelope: {}", e);
            None
        }
    };
    let Some(encrypted) = encrypted else {
        warn!("WeChat callback without an encrypted payload");
        return success();
    };

    let signature = query
        .msg_signature
        .as_deref()
        .or(query.signature.as_deref())
        .unwrap_or_default();
    if !crypt.verify_signature(signature, &query.timestamp, &query.nonce, Some(&encrypted)) {
        warn!("WeChat message signature verification failed");
        return plain(StatusCode::FORBIDDEN, "Invalid signature");
    }

    let xml = match crypt.decrypt(&encrypted) {
        Ok(xml) => xml,
        Err(e) => return ApiError::Internal(format!("Failed to decrypt message: {e}")).into_response(),
    };
    debug!("Decrypted WeChat message: {}", xml);

    let message = match InboundMessage::parse(&xml) {
        Ok(message) => message,
        Err(e) => {
            warn!("Unreadable WeChat message: {}", e);
            return success();
        }
    };

    match handle_inbound(&state, crypt, &query, &message, &xml).await {
        Ok(Some(reply)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/xml")],
            reply,
        )
            .into_response(),
        Ok(None) => success(),
        Err(e) => e.into_response(),
    }
}

async fn handle_inbound(
    state: &AppState,
    crypt: &MsgCrypt,
    query: &CallbackQuery,
    message: &InboundMessage,
    xml: &str,
) -> Result<Option<String>> {
    let pool = state.db.pool();
    let openid = message.openid();

    let user_id = wechat_rows::get_mapping(pool, openid)
        .await?
        .and_then(|mapping| mapping.user_id);

    let content = match message {
        InboundMessage::Text { content, .. } => Some(content.as_str()),
        _ => None,
    };
    if let Err(e) = wechat_rows::record_inbound(
        pool,
        InboundRecord {
            openid,
            user_id: user_id.as_deref(),
            msg_type: message.msg_type(),
            event: message.event_name(),
            content,
            raw_xml: xml,
        },
    )
    .await
    {
        warn!("Failed to record WeChat message from {}: {}", openid, e);
    }

    if let InboundMessage::Event { event, .. } = message {
        match event {
            WechatEvent::Subscribe { .. } => wechat_rows::upsert_mapping(pool, openid, true).await?,
            WechatEvent::Unsubscribe => wechat_rows::upsert_mapping(pool, openid, false).await?,
            _ => {}
        }
    }

    if let Some(scene) = message.scene() {
        let marked =
            wechat_rows::mark_login_scanned(pool, scene, openid, user_id.as_deref()).await?;
        if marked {
            info!("Login scene {} scanned by {}", scene, openid);
        } else {
            debug!("No live login attempt for scene {}", scene);
        }
        return Ok(None);
    }

    match message {
        InboundMessage::Text { header, content, .. } if !content.trim().is_empty() => {
            Ok(text_reply_envelope(state, crypt, query, header, content).await)
        }
        _ => Ok(None),
    }
}

/// Ask the model for a short reply. Any failure means no reply.
async fn text_reply_envelope(
    state: &AppState,
    crypt: &MsgCrypt,
    query: &CallbackQuery,
    header: &wechat::MessageHeader,
    content: &str,
) -> Option<String> {
    let chat = state.chat.as_ref()?;

    let request =
        CompletionRequest::new(WECHAT_ASSISTANT_PROMPT, vec![ChatMessage::user(content)]);
    let completion = match chat.complete(request).await {
        Ok(completion) => completion,
        Err(e) => {
            warn!("WeChat reply generation failed: {}", e);
            return None;
        }
    };

    let text = completion
        .content
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| WECHAT_FALLBACK_REPLY.to_string());
    let reply = text_reply(header, &text, unix_timestamp());

    match crypt.reply_envelope(&reply, &query.timestamp, &query.nonce) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!("Failed to encrypt WeChat reply: {}", e);
            None
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAttemptView {
    pub scene: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub expires_at: String,
}

/// `POST /wechat/login`: start a QR login and return its scene.
pub async fn create_login(State(state): State<AppState>) -> Result<(StatusCode, Json<LoginAttemptView>)> {
    let scene = format!("login_{}", Uuid::new_v4().simple());
    wechat_rows::create_login_attempt(state.db.pool(), &scene, state.login_ttl_secs).await?;
    let attempt = wechat_rows::get_login_attempt(state.db.pool(), &scene).await?;

    info!("Created login scene {}", scene);
    Ok((StatusCode::CREATED, Json(attempt.into())))
}

/// `GET /wechat/login/:scene`
pub async fn login_status(
    State(state): State<AppState>,
    Path(scene): Path<String>,
) -> Result<Json<LoginAttemptView>> {
    let attempt = wechat_rows::get_login_attempt(state.db.pool(), &scene).await?;
    Ok(Json(attempt.into()))
}

/// `POST /wechat/login/:scene/confirm`: bind the scanning openid to the
/// caller's account.
pub async fn confirm_login(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(scene): Path<String>,
) -> Result<Json<LoginAttemptView>> {
    let pool = state.db.pool();
    let confirmed = wechat_rows::confirm_login(pool, &scene, &user_id).await?;
    let attempt = wechat_rows::get_login_attempt(pool, &scene).await?;

    if !confirmed {
        return Err(ApiError::Conflict(format!(
            "Login attempt is {}, not scanned",
            attempt.status
        )));
    }

    info!("Login scene {} confirmed for {}", scene, user_id);
    Ok(Json(attempt.into()))
}

impl From<WechatLoginAttempt> for LoginAttemptView {
    fn from(attempt: WechatLoginAttempt) -> Self {
        Self {
            scene: attempt.scene,
            status: attempt.status,
            user_id: attempt.user_id,
            expires_at: attempt.expires_at,
        }
    }
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
