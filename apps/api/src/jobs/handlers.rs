use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::assistant::{draft_job, AssistRequest, JobDraft};
use crate::jobs::categories::{slugify, CATEGORIES};
use crate::jobs::images::upload_job_image;
use crate::jobs::listing::{search, JobCard, ListingFilter, SearchParams, SearchResult};
use crate::jobs::posting::{JobPatch, NewJobRequest};
use crate::jobs::repository;
use crate::models::job::{JobCompletionRow, JobRow, JobStatus};
use crate::state::AppState;

const HOME_SECTION_LIMIT: i64 = 12;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct CategoryInfo {
    pub name: &'static str,
    pub slug: String,
}

#[derive(Deserialize)]
pub struct CompleteJobRequest {
    pub user_id: Uuid,
    pub worker_id: Uuid,
}

/// GET /api/v1/jobs?q=&category=&city=&limit=
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResult>, AppError> {
    let filter = ListingFilter::from_params(&params);
    let jobs = repository::search_active_jobs(&state.db, &filter).await?;
    Ok(Json(search(jobs, &params, Utc::now())))
}

/// GET /api/v1/jobs/urgent
pub async fn handle_urgent_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobCard>>, AppError> {
    let now = Utc::now();
    let cards = repository::list_urgent_jobs(&state.db, HOME_SECTION_LIMIT)
        .await?
        .into_iter()
        .map(|j| JobCard::from_row(j, now))
        .collect();
    Ok(Json(cards))
}

/// GET /api/v1/jobs/featured
pub async fn handle_featured_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobCard>>, AppError> {
    let now = Utc::now();
    let cards = repository::list_featured_jobs(&state.db, HOME_SECTION_LIMIT)
        .await?
        .into_iter()
        .map(|j| JobCard::from_row(j, now))
        .collect();
    Ok(Json(cards))
}

/// GET /api/v1/jobs/mine?user_id=
pub async fn handle_my_jobs(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<JobCard>>, AppError> {
    let now = Utc::now();
    let cards = repository::list_jobs_by_owner(&state.db, params.user_id)
        .await?
        .into_iter()
        .map(|j| JobCard::from_row(j, now))
        .collect();
    Ok(Json(cards))
}

/// GET /api/v1/categories
pub async fn handle_list_categories() -> Json<Vec<CategoryInfo>> {
    Json(
        CATEGORIES
            .iter()
            .map(|&name| CategoryInfo {
                name,
                slug: slugify(name),
            })
            .collect(),
    )
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobCard>, AppError> {
    let job = require_job(&state, job_id).await?;
    Ok(Json(JobCard::from_row(job, Utc::now())))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<NewJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let request = request.validated()?;
    let job = repository::create_job(&state.db, &request).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(patch): Json<JobPatch>,
) -> Result<Json<JobRow>, AppError> {
    let patch = patch.validated()?;
    let existing = require_job(&state, job_id).await?;
    ensure_owner(&existing, patch.user_id)?;
    repository::update_job(&state.db, job_id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// DELETE /api/v1/jobs/:id?user_id=
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let existing = require_job(&state, job_id).await?;
    ensure_owner(&existing, params.user_id)?;
    let deleted = repository::delete_job(&state.db, job_id, params.user_id).await?;
    deletion_status(job_id, deleted)
}

/// A delete that matched no row means the job vanished after the ownership check.
fn deletion_status(job_id: Uuid, deleted: bool) -> Result<StatusCode, AppError> {
    if !deleted {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/:id/complete
pub async fn handle_complete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<CompleteJobRequest>,
) -> Result<(StatusCode, Json<JobCompletionRow>), AppError> {
    let job = require_job(&state, job_id).await?;
    ensure_owner(&job, request.user_id)?;
    if request.worker_id == request.user_id {
        return Err(AppError::Validation(
            "an employer cannot complete their own job as the worker".to_string(),
        ));
    }
    let status: JobStatus = job
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    if status != JobStatus::Active {
        return Err(not_completable(job_id, status));
    }
    // Another request may complete the job between the read above and this write.
    let completion =
        repository::complete_job(&state.db, job_id, request.user_id, request.worker_id)
            .await?
            .ok_or_else(|| not_completable(job_id, JobStatus::Completed))?;
    Ok((StatusCode::CREATED, Json(completion)))
}

/// POST /api/v1/jobs/:id/images?user_id= (multipart, field "image")
pub async fn handle_upload_image(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
    mut multipart: Multipart,
) -> Result<Json<JobRow>, AppError> {
    let job = require_job(&state, job_id).await?;
    ensure_owner(&job, params.user_id)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("could not read image: {e}")))?;
        let url = upload_job_image(
            &state.s3,
            &state.config.s3_endpoint,
            &state.config.s3_bucket,
            job_id,
            &content_type,
            data,
        )
        .await?;
        let updated = repository::append_image(&state.db, job_id, &url).await?;
        return Ok(Json(updated));
    }

    Err(AppError::Validation(
        "multipart body has no 'image' field".to_string(),
    ))
}

/// POST /api/v1/jobs/assist
pub async fn handle_assist(
    State(state): State<AppState>,
    Json(request): Json<AssistRequest>,
) -> Result<Json<JobDraft>, AppError> {
    Ok(Json(draft_job(&state.llm, &request).await?))
}

async fn require_job(state: &AppState, job_id: Uuid) -> Result<JobRow, AppError> {
    repository::get_job(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

fn not_completable(job_id: Uuid, status: JobStatus) -> AppError {
    AppError::Conflict(format!("Job {job_id} is {status} and cannot be completed"))
}

fn ensure_owner(job: &JobRow, user_id: Uuid) -> Result<(), AppError> {
    if job.user_id != user_id {
        return Err(AppError::Forbidden(format!(
            "Job {} belongs to another user",
            job.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_of_missing_row_is_not_found() {
        let id = Uuid::new_v4();
        assert_eq!(deletion_status(id, true).unwrap(), StatusCode::NO_CONTENT);
        assert!(matches!(deletion_status(id, false), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_lost_completion_race_is_conflict() {
        let err = not_completable(Uuid::new_v4(), JobStatus::Completed);
        assert!(matches!(&err, AppError::Conflict(msg) if msg.contains("is completed")));
    }
}
