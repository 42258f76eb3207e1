use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::repository::get_completion;
use crate::models::rating::RatingRow;
use crate::ratings::repository;
use crate::ratings::scoring::RatingRequest;
use crate::state::AppState;

/// POST /api/v1/ratings
pub async fn handle_submit_rating(
    State(state): State<AppState>,
    Json(request): Json<RatingRequest>,
) -> Result<(StatusCode, Json<RatingRow>), AppError> {
    let completion_id = request.job_completion_id;
    let completion = get_completion(&state.db, completion_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job completion {completion_id} not found")))?;
    let rating = request.validated(&completion)?;
    let row = repository::submit_rating(&state.db, &rating).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/profiles/:user_id/ratings
pub async fn handle_list_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<RatingRow>>, AppError> {
    Ok(Json(repository::list_ratings_for_user(&state.db, user_id).await?))
}
