mod messages;

pub use messages::*;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gather_shared::validation::validate_room_title;
use serde::Deserialize;
use std::sync::Arc;

use crate::chat::{access, identity};
use crate::chat::access::EventGate;
use crate::chat::unread;
use crate::error::{AppError, AppResult, Denial};
use crate::models::{
    AuthUser, CreateDirectRoomRequest, CreateTopicRoomRequest, MyRoom, Room, RoomAccess, RoomKind,
    UnlockRoomRequest, UnreadRoomsSummary,
};
use crate::ratelimit::LimitClass;
use crate::{db, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyRoomsQuery {
    #[serde(default)]
    pub only_active: bool,
}

/// POST /api/events/:eventId/room
pub async fn open_event_room(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
) -> AppResult<Json<RoomAccess>> {
    let event = access::load_event(&state.db, &event_id).await?;

    match access::event_gate(&state.db, &user.id, &event).await? {
        EventGate::Granted => {
            let room = identity::find_or_create_event_room(&state.db, &event, &state.config).await?;
            identity::ensure_membership(&state.db, &room.id, &user.id).await?;
            Ok(Json(RoomAccess::Open(room)))
        }
        EventGate::Locked => Ok(Json(RoomAccess::Locked { locked: true })),
    }
}

/// POST /api/events/:eventId/room/unlock
pub async fn unlock_event_room(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
    Json(body): Json<UnlockRoomRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let event = access::load_event(&state.db, &event_id).await?;

    if !event.is_private {
        return Ok(Json(serde_json::json!({ "unlocked": true })));
    }

    if access::event_gate(&state.db, &user.id, &event).await? == EventGate::Locked {
        state
            .limiter
            .check(LimitClass::RoomUnlock, &event.id, &user.id)
            .await?;

        let code_matches = event
            .access_code
            .as_deref()
            .is_some_and(|code| !code.is_empty() && code == body.code.trim());
        if !code_matches {
            tracing::debug!(event_id = %event.id, actor = %user.id, "Wrong access code");
            return Err(AppError::Forbidden(Denial::InvalidCode));
        }
    }

    let room = identity::find_or_create_event_room(&state.db, &event, &state.config).await?;
    identity::ensure_membership(&state.db, &room.id, &user.id).await?;

    Ok(Json(serde_json::json!({ "unlocked": true, "roomId": room.id })))
}

/// POST /api/rooms/direct
pub async fn create_direct_room(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateDirectRoomRequest>,
) -> AppResult<Json<Room>> {
    if body.user_id == user.id {
        return Err(AppError::Conflict("Cannot message yourself"));
    }
    let peer = access::load_user_privacy(&state.db, &body.user_id).await?;
    access::check_direct_message(&state.db, &user.id, &peer).await?;

    let room = identity::find_or_create_dm_room(&state.db, &user.id, &peer.id).await?;
    Ok(Json(room))
}

/// POST /api/rooms/topic
pub async fn create_topic_room(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateTopicRoomRequest>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let title = validate_room_title(&body.title).map_err(AppError::InvalidInput)?;

    let active_until = match body.active_until.as_deref() {
        Some(raw) => Some(
            db::normalize_timestamp(raw)
                .ok_or_else(|| AppError::InvalidInput("Invalid activeUntil timestamp".into()))?,
        ),
        None => None,
    };

    let room = identity::create_topic_room(
        &state.db,
        &user.id,
        &title,
        body.is_private,
        active_until.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(room)))
}

/// GET /api/rooms/mine
pub async fn list_my_rooms(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<MyRoomsQuery>,
) -> AppResult<Json<Vec<MyRoom>>> {
    let rooms = unread::my_rooms(&state.db, &user.id, query.only_active).await?;
    Ok(Json(rooms))
}

/// GET /api/rooms/unread
pub async fn unread_rooms(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<UnreadRoomsSummary>> {
    let summary = unread::unread_rooms(&state.db, &user.id).await?;
    Ok(Json(summary))
}

/// POST /api/rooms/:roomId/archive
pub async fn archive_room(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> AppResult<StatusCode> {
    let room = identity::find_room(&state.db, &room_id).await?;

    match room.kind {
        RoomKind::Dm => return Err(AppError::Forbidden(Denial::WrongRoomType)),
        RoomKind::Event | RoomKind::Topic => {
            if room.created_by != user.id {
                return Err(AppError::Forbidden(Denial::NotOwner));
            }
        }
    }

    identity::archive_room(&state.db, &room.id).await?;
    tracing::info!(room_id = %room.id, actor = %user.id, "Room archived");

    Ok(StatusCode::NO_CONTENT)
}
