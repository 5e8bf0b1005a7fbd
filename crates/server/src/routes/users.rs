use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::chat::access;
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, PrivacySettings, UpdatePrivacyRequest};
use crate::{db, AppState};

/// GET /api/users/me/privacy
pub async fn get_privacy(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<PrivacySettings>> {
    let me = access::load_user_privacy(&state.db, &user.id).await?;
    Ok(Json(PrivacySettings {
        dm_opt_in: me.dm_opt_in,
        dm_policy: me.dm_policy,
    }))
}

/// PATCH /api/users/me/privacy
pub async fn update_privacy(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<UpdatePrivacyRequest>,
) -> AppResult<Json<PrivacySettings>> {
    if let Some(opt_in) = body.dm_opt_in {
        sqlx::query(r#"UPDATE "user" SET dm_opt_in = ? WHERE id = ?"#)
            .bind(opt_in)
            .bind(&user.id)
            .execute(&state.db)
            .await?;
    }

    if let Some(policy) = body.dm_policy {
        sqlx::query(r#"UPDATE "user" SET dm_policy = ? WHERE id = ?"#)
            .bind(policy)
            .bind(&user.id)
            .execute(&state.db)
            .await?;
    }

    get_privacy(State(state), user).await
}

async fn ensure_other_user(state: &AppState, user: &AuthUser, target_id: &str) -> AppResult<()> {
    if target_id == user.id {
        return Err(AppError::InvalidInput("Cannot target yourself".into()));
    }
    access::load_user_privacy(&state.db, target_id).await?;
    Ok(())
}

/// PUT /api/users/:userId/block
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(target_id): Path<String>,
) -> AppResult<StatusCode> {
    ensure_other_user(&state, &user, &target_id).await?;

    sqlx::query("INSERT OR IGNORE INTO blocks (blocker_id, blocked_id, created_at) VALUES (?, ?, ?)")
        .bind(&user.id)
        .bind(&target_id)
        .bind(db::now())
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/users/:userId/block
pub async fn unblock_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(target_id): Path<String>,
) -> AppResult<StatusCode> {
    sqlx::query("DELETE FROM blocks WHERE blocker_id = ? AND blocked_id = ?")
        .bind(&user.id)
        .bind(&target_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/:userId/follow
pub async fn follow_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(target_id): Path<String>,
) -> AppResult<StatusCode> {
    ensure_other_user(&state, &user, &target_id).await?;

    sqlx::query("INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)")
        .bind(&user.id)
        .bind(&target_id)
        .bind(db::now())
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/users/:userId/follow
pub async fn unfollow_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(target_id): Path<String>,
) -> AppResult<StatusCode> {
    sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
        .bind(&user.id)
        .bind(&target_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
