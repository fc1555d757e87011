//! Chat handlers: listing-scoped two-participant threads.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use vista_shared::api::{
    ApiResponse, ChatDetail, ChatParticipant, ChatSummary, CreateChatRequest, MessageResponse,
    SendMessageRequest, UserSummary,
};
use vista_shared::types::ChatRole;
use vista_store::{Chat, Database, Message};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

const CHAT_NOT_FOUND: &str = "Chat not found";
const LISTING_NOT_FOUND: &str = "Boarding house not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_chats).post(create_chat))
        .route(
            "/:id",
            get(get_chat).post(send_message).put(mark_messages_read),
        )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ensure_participant(chat: &Chat, caller: &AuthUser, denied_message: &str) -> Result<(), ApiError> {
    if chat.is_participant(caller.id()) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denied_message.to_string()))
    }
}

fn user_summary(db: &Database, id: Uuid) -> Result<UserSummary, ApiError> {
    let user = db.get_user(id)?;
    Ok(UserSummary {
        id: user.id,
        name: user.name,
        profile_image: user.profile_image,
    })
}

fn participants_of(db: &Database, chat: &Chat) -> Result<Vec<ChatParticipant>, ApiError> {
    Ok(vec![
        ChatParticipant {
            user: user_summary(db, chat.owner_id)?,
            role: ChatRole::Owner,
        },
        ChatParticipant {
            user: user_summary(db, chat.tenant_id)?,
            role: ChatRole::Tenant,
        },
    ])
}

fn message_response(db: &Database, message: Message) -> Result<MessageResponse, ApiError> {
    let sender = user_summary(db, message.sender_id)?;
    Ok(MessageResponse {
        id: message.id,
        sender,
        content: message.content,
        message_type: message.message_type,
        file_url: message.file_url,
        is_read: message.is_read,
        read_at: message.read_at,
        created_at: message.created_at,
    })
}

fn summary_of(db: &Database, chat: Chat, caller_id: Uuid) -> Result<ChatSummary, ApiError> {
    let listing = db.get_listing(chat.listing_id)?;
    let participants = participants_of(db, &chat)?;
    let unread_count = db.unread_count(chat.id, caller_id)?;
    let last_message = chat
        .last_message
        .map(|message| message_response(db, message))
        .transpose()?;

    Ok(ChatSummary {
        id: chat.id,
        listing_id: chat.listing_id,
        listing_title: listing.title,
        participants,
        last_message,
        unread_count,
        is_active: chat.is_active,
        created_at: chat.created_at,
        updated_at: chat.updated_at,
    })
}

fn detail_of(db: &Database, chat: Chat) -> Result<ChatDetail, ApiError> {
    let listing = db.get_listing(chat.listing_id)?;
    let participants = participants_of(db, &chat)?;

    let mut messages = Vec::new();
    for message in db.list_messages(chat.id)? {
        messages.push(message_response(db, message)?);
    }

    Ok(ChatDetail {
        id: chat.id,
        listing_id: chat.listing_id,
        listing_title: listing.title,
        participants,
        messages,
        is_active: chat.is_active,
        created_at: chat.created_at,
        updated_at: chat.updated_at,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_chats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<ChatSummary>>>, ApiError> {
    let db = state.db.lock().await;
    let chats = db.list_chats_for_user(auth.id())?;

    let mut items = Vec::with_capacity(chats.len());
    for chat in chats {
        items.push(summary_of(&db, chat, auth.id())?);
    }

    Ok(Json(ApiResponse::ok(items)))
}

async fn create_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChatSummary>>), ApiError> {
    if req.participant_id == auth.id() {
        return Err(ApiError::BadRequest(
            "Cannot start a chat with yourself".into(),
        ));
    }

    let db = state.db.lock().await;

    db.get_listing(req.listing_id)
        .map_err(|e| ApiError::from_store(e, LISTING_NOT_FOUND))?;
    db.get_user(req.participant_id)
        .map_err(|e| ApiError::from_store(e, "User not found"))?;

    // Reuse the existing thread for this (listing, pair) instead of
    // creating a duplicate.
    if let Some(existing) = db.find_chat(req.listing_id, auth.id(), req.participant_id)? {
        let summary = summary_of(&db, existing, auth.id())?;
        return Ok((StatusCode::OK, Json(ApiResponse::ok(summary))));
    }

    // The creator's role decides the owner/tenant tagging.
    let (owner_id, tenant_id) = if auth.role() == vista_shared::types::Role::Owner {
        (auth.id(), req.participant_id)
    } else {
        (req.participant_id, auth.id())
    };

    let now = Utc::now();
    let chat = Chat {
        id: Uuid::new_v4(),
        listing_id: req.listing_id,
        owner_id,
        tenant_id,
        last_message: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.create_chat(&chat)?;

    info!(chat_id = %chat.id, listing_id = %chat.listing_id, "chat created");

    let summary = summary_of(&db, chat, auth.id())?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(summary))))
}

async fn get_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChatDetail>>, ApiError> {
    let db = state.db.lock().await;
    let chat = db
        .get_chat(id)
        .map_err(|e| ApiError::from_store(e, CHAT_NOT_FOUND))?;

    ensure_participant(&chat, &auth, "Not authorized to access this chat")?;

    Ok(Json(ApiResponse::ok(detail_of(&db, chat)?)))
}

async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChatDetail>>), ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::invalid_field(
            "content",
            "Message content is required",
        ));
    }

    let db = state.db.lock().await;
    let chat = db
        .get_chat(id)
        .map_err(|e| ApiError::from_store(e, CHAT_NOT_FOUND))?;

    ensure_participant(&chat, &auth, "Not authorized to send messages in this chat")?;

    let message = Message {
        id: Uuid::new_v4(),
        chat_id: chat.id,
        sender_id: auth.id(),
        content: req.content,
        message_type: req.message_type,
        file_url: req.file_url,
        is_read: false,
        read_at: None,
        created_at: Utc::now(),
    };
    db.append_message(&message)?;

    let chat = db.get_chat(id)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(detail_of(&db, chat)?)),
    ))
}

async fn mark_messages_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChatDetail>>, ApiError> {
    let db = state.db.lock().await;
    let chat = db
        .get_chat(id)
        .map_err(|e| ApiError::from_store(e, CHAT_NOT_FOUND))?;

    ensure_participant(&chat, &auth, "Not authorized to access this chat")?;

    let flipped = db.mark_messages_read(chat.id, auth.id(), Utc::now())?;
    if flipped > 0 {
        info!(chat_id = %chat.id, flipped, "messages marked read");
    }

    Ok(Json(ApiResponse::ok(detail_of(&db, chat)?)))
}
