mod messages;

pub use messages::*;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use gather_shared::constants::{THREAD_PAGE_MAX, THREAD_PAGE_SIZE};
use gather_shared::validation::{clamp_page_size, validate_message_text};
use serde::Deserialize;
use std::sync::Arc;

use crate::chat::{access, pair_key, store, unread, Cursor};
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, Page, SendMessageRequest, SentDirectMessage, ThreadSummary};
use crate::ratelimit::LimitClass;
use crate::AppState;

#[derive(Deserialize)]
pub struct ThreadQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// POST /api/dms/:peerId/messages
pub async fn send_direct_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(peer_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<Json<SentDirectMessage>> {
    let text = validate_message_text(&body.text).map_err(AppError::InvalidInput)?;

    if peer_id == user.id {
        return Err(AppError::Conflict("Cannot message yourself"));
    }
    let recipient = access::load_user_privacy(&state.db, &peer_id).await?;
    access::check_direct_message(&state.db, &user.id, &recipient).await?;

    state
        .limiter
        .check(LimitClass::DmSend, "dm", &user.id)
        .await?;

    let thread_key = pair_key(&user.id, &recipient.id);
    let message = store::append_direct(&state.db, &thread_key, &user.id, &recipient.id, &text).await?;

    tracing::debug!(thread_key = %thread_key, message_id = %message.id, "Direct message sent");

    Ok(Json(SentDirectMessage {
        id: message.id,
        thread_key,
        created_at: message.created_at,
    }))
}

/// GET /api/dms
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ThreadQuery>,
) -> AppResult<Json<Page<ThreadSummary>>> {
    let limit = clamp_page_size(query.limit, THREAD_PAGE_SIZE, THREAD_PAGE_MAX);
    let cursor = query.cursor.as_deref().map(Cursor::parse).transpose()?;

    let page = unread::list_threads(&state.db, &user.id, cursor.as_ref(), limit).await?;
    Ok(Json(page))
}

/// GET /api/dms/unread
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let count = unread::direct_unread_count(&state.db, &user.id).await?;
    Ok(Json(serde_json::json!({ "unreadCount": count })))
}
