use axum::{
    extract::{Path, Query, State},
    Json,
};
use gather_shared::constants::{DM_PAGE_MAX, DM_PAGE_SIZE};
use gather_shared::validation::clamp_page_size;
use serde::Deserialize;
use std::sync::Arc;

use crate::chat::{access, pair_key, store, Cursor};
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, DirectMessage, MarkReadRequest, Page};
use crate::tasks::best_effort;
use crate::{db, AppState};

#[derive(Deserialize)]
pub struct DirectMessageQuery {
    pub before: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/dms/:peerId/messages
///
/// Inbound messages on the returned page are marked read.
pub async fn list_direct_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(peer_id): Path<String>,
    Query(query): Query<DirectMessageQuery>,
) -> AppResult<Json<Page<DirectMessage>>> {
    if peer_id == user.id {
        return Err(AppError::Conflict("Cannot message yourself"));
    }
    let peer = access::load_peer(&state.db, &peer_id).await?;

    let limit = clamp_page_size(query.limit, DM_PAGE_SIZE, DM_PAGE_MAX);
    let before = query.before.as_deref().map(Cursor::parse).transpose()?;
    let thread_key = pair_key(&user.id, &peer.id);

    let mut page = store::page_direct(&state.db, &thread_key, before.as_ref(), limit).await?;

    let unread_ids: Vec<&str> = page
        .items
        .iter()
        .filter(|m| m.recipient_id == user.id && m.read_at.is_none())
        .map(|m| m.id.as_str())
        .collect();

    if !unread_ids.is_empty() {
        let read_at = db::now();
        let marked = best_effort(
            "dm.mark_fetched_read",
            store::mark_direct_ids_read(&state.db, &user.id, &unread_ids, &read_at),
        )
        .await;

        if marked.is_some() {
            for message in page.items.iter_mut() {
                if message.recipient_id == user.id && message.read_at.is_none() {
                    message.read_at = Some(read_at.clone());
                }
            }
        }
    }

    Ok(Json(page))
}

/// POST /api/dms/:peerId/read
pub async fn mark_thread_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(peer_id): Path<String>,
    body: Option<Json<MarkReadRequest>>,
) -> AppResult<Json<serde_json::Value>> {
    let up_to = match body.and_then(|Json(b)| b.up_to) {
        Some(raw) => db::normalize_timestamp(&raw)
            .ok_or_else(|| AppError::InvalidInput("Invalid upTo timestamp".into()))?,
        None => db::now(),
    };

    let thread_key = pair_key(&user.id, &peer_id);
    let updated = store::mark_direct_read(&state.db, &thread_key, &user.id, &up_to).await?;

    Ok(Json(serde_json::json!({ "updated": updated })))
}
