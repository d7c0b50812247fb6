//! Presence lookup endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::connection_manager::UserPresence;
use crate::error::{AppError, Result};
use crate::server::AppState;

/// GET /api/v1/users/{user_id}/presence - Current presence of a user
pub async fn get_user_presence(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserPresence>> {
    if user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id must not be blank".to_string()));
    }

    Ok(Json(state.tracker.user_presence(&user_id).await))
}
