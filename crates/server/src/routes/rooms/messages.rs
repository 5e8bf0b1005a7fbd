use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gather_shared::constants::{ROOM_PAGE_MAX, ROOM_PAGE_SIZE};
use gather_shared::validation::{clamp_page_size, validate_message_text};
use serde::Deserialize;
use std::sync::Arc;

use crate::chat::{access, identity, store, unread, Cursor};
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, MarkReadRequest, Page, RoomMessage, SendMessageRequest, SentRoomMessage};
use crate::ratelimit::LimitClass;
use crate::tasks::{best_effort, spawn_best_effort};
use crate::{db, AppState};

#[derive(Deserialize)]
pub struct RoomMessageQuery {
    pub before: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/rooms/:roomId/messages
///
/// Reading advances the caller's read cursor to now.
pub async fn list_room_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_id): Path<String>,
    Query(query): Query<RoomMessageQuery>,
) -> AppResult<Json<Page<RoomMessage>>> {
    let room = identity::find_room(&state.db, &room_id).await?;
    access::authorize_room_read(&state.db, &user.id, &room).await?;

    let limit = clamp_page_size(query.limit, ROOM_PAGE_SIZE, ROOM_PAGE_MAX);
    let before = query.before.as_deref().map(Cursor::parse).transpose()?;

    let page = store::page_room(&state.db, &room.id, before.as_ref(), limit).await?;

    best_effort(
        "room.advance_cursor",
        store::advance_read_cursor(&state.db, &room.id, &user.id, &db::now()),
    )
    .await;

    Ok(Json(page))
}

/// POST /api/rooms/:roomId/messages
pub async fn post_room_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<SentRoomMessage>)> {
    let text = validate_message_text(&body.text).map_err(AppError::InvalidInput)?;

    let room = identity::find_room(&state.db, &room_id).await?;
    access::authorize_room_post(&state.db, &user.id, &room).await?;

    state
        .limiter
        .check(LimitClass::RoomPost, &room.id, &user.id)
        .await?;

    let message = store::append_room(&state.db, &room.id, &user.id, &text).await?;

    // The poster has seen their own message.
    best_effort(
        "room.advance_own_cursor",
        store::advance_read_cursor(&state.db, &room.id, &user.id, &message.created_at),
    )
    .await;

    let db = state.db.clone();
    let (touch_id, touch_at) = (room.id.clone(), message.created_at.clone());
    spawn_best_effort("room.touch", async move {
        store::touch_room(&db, &touch_id, &touch_at).await
    });

    Ok((
        StatusCode::CREATED,
        Json(SentRoomMessage {
            id: message.id,
            room_id: room.id,
            created_at: message.created_at,
        }),
    ))
}

/// POST /api/rooms/:roomId/read
pub async fn mark_room_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_id): Path<String>,
    body: Option<Json<MarkReadRequest>>,
) -> AppResult<Json<serde_json::Value>> {
    let room = identity::find_room(&state.db, &room_id).await?;
    access::authorize_room_read(&state.db, &user.id, &room).await?;

    // A cursor in the future would hide messages that do not exist yet.
    let now = db::now();
    let up_to = match body.and_then(|Json(b)| b.up_to) {
        Some(raw) => db::normalize_timestamp(&raw)
            .ok_or_else(|| AppError::InvalidInput("Invalid upTo timestamp".into()))?
            .min(now),
        None => now,
    };

    let advanced = store::advance_read_cursor(&state.db, &room.id, &user.id, &up_to).await?;
    let has_unread = unread::room_has_unread(&state.db, &room.id, &user.id).await?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "advanced": advanced,
        "hasUnread": has_unread,
    })))
}
