use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::repository::get_job;
use crate::messaging::repository;
use crate::messaging::stream::backlog_then_live;
use crate::messaging::thread::normalize_content;
use crate::models::messaging::{ConversationRow, ConversationSummary, MessageRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StartConversationRequest {
    pub job_id: Uuid,
    pub user_id: Uuid,
    /// Required when the job owner starts the conversation.
    pub worker_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ParticipantQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct PollQuery {
    pub user_id: Uuid,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub user_id: Uuid,
    pub content: String,
    pub client_id: Option<Uuid>,
}

/// POST /api/v1/conversations
pub async fn handle_start_conversation(
    State(state): State<AppState>,
    Json(request): Json<StartConversationRequest>,
) -> Result<Json<ConversationRow>, AppError> {
    let job = get_job(&state.db, request.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", request.job_id)))?;
    let (employer_id, worker_id) =
        conversation_parties(job.user_id, request.user_id, request.worker_id)?;
    let conversation =
        repository::get_or_create_conversation(&state.db, job.id, employer_id, worker_id).await?;
    Ok(Json(conversation))
}

/// GET /api/v1/conversations?user_id=
pub async fn handle_list_conversations(
    State(state): State<AppState>,
    Query(params): Query<ParticipantQuery>,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    Ok(Json(repository::list_conversations(&state.db, params.user_id).await?))
}

/// GET /api/v1/conversations/:id/messages?user_id=&since=
pub async fn handle_poll_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<PollQuery>,
) -> Result<Json<Vec<MessageRow>>, AppError> {
    require_participant(&state, conversation_id, params.user_id).await?;
    let messages = repository::list_messages(&state.db, conversation_id, params.since).await?;
    Ok(Json(messages))
}

/// POST /api/v1/conversations/:id/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageRow>), AppError> {
    let content = normalize_content(&request.content)?;
    require_participant(&state, conversation_id, request.user_id).await?;

    let (message, created) = repository::insert_message(
        &state.db,
        conversation_id,
        request.user_id,
        &content,
        request.client_id,
    )
    .await?;

    if !created {
        if message.sender_id != request.user_id {
            return Err(AppError::Conflict(
                "client_id already used by another sender".to_string(),
            ));
        }
        return Ok((StatusCode::OK, Json(message)));
    }

    let listeners = state.hub.publish(&message).await;
    info!(
        "Message {} stored in {conversation_id}, pushed to {listeners} listeners",
        message.id
    );
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/conversations/:id/stream?user_id=
/// Server-Sent Events: the stored backlog first, then live messages.
pub async fn handle_stream(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<ParticipantQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    require_participant(&state, conversation_id, params.user_id).await?;

    // Subscribe before reading the backlog so no message falls in between.
    let rx = state.hub.subscribe(conversation_id).await;
    let backlog = repository::list_messages(&state.db, conversation_id, None).await?;
    let events = backlog_then_live(conversation_id, backlog, rx).map(|m| message_event(&m));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn message_event(message: &MessageRow) -> Result<Event, axum::Error> {
    Event::default()
        .event("message")
        .id(message.id.to_string())
        .json_data(message)
}

async fn require_participant(
    state: &AppState,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<ConversationRow, AppError> {
    let conversation = repository::get_conversation(&state.db, conversation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Conversation {conversation_id} not found")))?;
    if !conversation.is_participant(user_id) {
        return Err(AppError::Forbidden(
            "not a participant in this conversation".to_string(),
        ));
    }
    Ok(conversation)
}

/// Works out (employer, worker) for a conversation on a job owned by `owner_id`.
fn conversation_parties(
    owner_id: Uuid,
    user_id: Uuid,
    worker_id: Option<Uuid>,
) -> Result<(Uuid, Uuid), AppError> {
    if user_id != owner_id {
        return match worker_id {
            Some(w) if w != user_id => Err(AppError::Forbidden(
                "only the job owner can open a conversation for someone else".to_string(),
            )),
            _ => Ok((owner_id, user_id)),
        };
    }
    match worker_id {
        Some(w) if w != owner_id => Ok((owner_id, w)),
        Some(_) => Err(AppError::Validation(
            "cannot start a conversation with yourself".to_string(),
        )),
        None => Err(AppError::Validation(
            "worker_id is required when the job owner starts a conversation".to_string(),
        )),
    }
}
