//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    pub coach: bool,
    pub wechat: bool,
}

/// Health check endpoint, with which optional integrations are configured.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        coach: state.coach.is_some(),
        wechat: state.wechat.is_some(),
    })
}
