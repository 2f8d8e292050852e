//! Route handlers for the coaching API.

pub mod coach;
pub mod health;
pub mod profile;
pub mod wechat;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Coaching
        .route("/coach/:coach_key/messages", post(coach::post_message))
        .route("/coach/sessions/:session_id", get(coach::get_session))
        .route("/coach/sessions/:session_id/briefing", get(coach::get_briefing))
        .route("/coach/briefings", get(coach::list_briefings))
        // Profile
        .route("/profile", put(profile::update_profile))
        // WeChat
        .route(
            "/wechat/callback",
            get(wechat::verify_url).post(wechat::receive_message),
        )
        .route("/wechat/login", post(wechat::create_login))
        .route("/wechat/login/:scene", get(wechat::login_status))
        .route("/wechat/login/:scene/confirm", post(wechat::confirm_login))
}
