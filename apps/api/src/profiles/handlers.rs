use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::profiles::repository;
use crate::profiles::update::ProfilePatch;
use crate::state::AppState;

/// GET /api/v1/profiles/:user_id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileRow>, AppError> {
    repository::get_profile(&state.db, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Profile {user_id} not found")))
}

/// PATCH /api/v1/profiles/:user_id
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<ProfileRow>, AppError> {
    if patch.user_id != user_id {
        return Err(AppError::Forbidden(
            "profiles can only be edited by their owner".to_string(),
        ));
    }
    let patch = patch.validated()?;
    repository::update_profile(&state.db, user_id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Profile {user_id} not found")))
}
