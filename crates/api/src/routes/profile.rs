//! Profile settings that shape how the coach talks to the user.

use axum::extract::State;
use axum::Json;
use coaching::Companion;
use database::profile::{self, ProfileField};
use database::validation;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub companion_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub display_name: Option<String>,
    pub companion_type: Option<String>,
}

/// `PUT /profile`
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileView>> {
    let pool = state.db.pool();

    if let Some(name) = update.display_name.as_deref() {
        let name = name.trim();
        validation::validate_display_name(name)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        profile::upsert_profile_field(pool, &user_id, ProfileField::DisplayName, Some(name))
            .await?;
    }

    if let Some(key) = update.companion_type.as_deref() {
        if Companion::from_key(Some(key)).key != key {
            return Err(ApiError::BadRequest(format!("Unknown companion: {key}")));
        }
        profile::upsert_profile_field(pool, &user_id, ProfileField::CompanionType, Some(key))
            .await?;
    }

    let stored = profile::get_profile(pool, &user_id).await?;
    Ok(Json(ProfileView {
        display_name: stored.as_ref().and_then(|p| p.display_name.clone()),
        companion_type: stored.and_then(|p| p.companion_type),
    }))
}
