use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{chat_title, CreateChatRequest, SendMessageRequest},
    repo,
    repo_types::{Chat, Message},
};
use crate::{
    ai::worker::GenerationJob,
    auth::services::AuthUser,
    error::{AppError, AppResult},
    memory::retain_visible,
    profiles::{repo as profiles_repo, services::tier_of},
    state::AppState,
};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chats", get(list_chats).post(create_chat))
        .route("/chats/:id", axum::routing::delete(delete_chat))
        .route("/chats/:id/messages", get(list_messages).post(send_message))
}

#[instrument(skip(state))]
pub async fn list_chats(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
) -> AppResult<Json<Vec<Chat>>> {
    let Some(AuthUser(user_id)) = caller else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(repo::list_by_user(&state.db, user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_chat(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Option<Json<CreateChatRequest>>,
) -> AppResult<(StatusCode, Json<Chat>)> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let now = OffsetDateTime::now_utc();
    let title = chat_title(body.title.as_deref(), now);

    let chat = repo::create(&state.db, user_id, &title, now).await?;
    info!(%user_id, chat_id = %chat.id, "chat created");
    Ok((StatusCode::CREATED, Json(chat)))
}

#[instrument(skip(state))]
pub async fn delete_chat(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(chat_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let chat = repo::find_owned(&state.db, chat_id, user_id)
        .await?
        .ok_or(AppError::NotFound("Chat"))?;

    repo::delete_with_messages(&state.db, chat.id).await?;
    info!(%user_id, %chat_id, "chat deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Messages the caller may see: free accounts only get the rolling 48-hour window.
#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Path(chat_id): Path<Uuid>,
) -> AppResult<Json<Vec<Message>>> {
    let Some(AuthUser(user_id)) = caller else {
        return Ok(Json(Vec::new()));
    };
    let Some(chat) = repo::find_owned(&state.db, chat_id, user_id).await? else {
        return Ok(Json(Vec::new()));
    };

    let now = OffsetDateTime::now_utc();
    let profile = profiles_repo::find_by_user(&state.db, user_id).await?;
    let messages = repo::list_messages(&state.db, chat.id).await?;
    Ok(Json(retain_visible(messages, tier_of(profile.as_ref()), now)))
}

/// Records the user's turn and hands reply generation to the background queue.
#[instrument(skip(state, body))]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(chat_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let chat = repo::find_owned(&state.db, chat_id, user_id)
        .await?
        .ok_or(AppError::NotFound("Chat"))?;

    if body.content.trim().is_empty() {
        warn!(%user_id, %chat_id, "empty message rejected");
        return Err(AppError::BadRequest("Message cannot be empty".into()));
    }

    let message =
        repo::append_user_message(&state.db, &chat, &body.content, OffsetDateTime::now_utc())
            .await?;
    state.jobs.enqueue(GenerationJob {
        chat_id: chat.id,
        message_id: message.id,
    });

    info!(%user_id, %chat_id, message_id = %message.id, "message sent");
    Ok((StatusCode::CREATED, Json(message)))
}
