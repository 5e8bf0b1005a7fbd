use sqlx::SqlitePool;

use super::identity;
use crate::db;
use crate::error::{AppError, AppResult, Denial};
use crate::models::{DmPolicy, Event, Room, RoomKind, UserPrivacy};

pub async fn load_user_privacy(db: &SqlitePool, user_id: &str) -> AppResult<UserPrivacy> {
    sqlx::query_as::<_, UserPrivacy>(
        r#"SELECT id, is_banned, dm_opt_in, dm_policy FROM "user" WHERE id = ?"#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound("User not found"))
}

/// Load a conversation peer. Banned users are reported as missing.
pub async fn load_peer(db: &SqlitePool, user_id: &str) -> AppResult<UserPrivacy> {
    let peer = load_user_privacy(db, user_id).await?;
    if peer.is_banned {
        return Err(AppError::NotFound("User not found"));
    }
    Ok(peer)
}

pub async fn load_event(db: &SqlitePool, event_id: &str) -> AppResult<Event> {
    sqlx::query_as::<_, Event>(
        "SELECT id, title, organizer_id, is_private, access_code, starts_at, ends_at FROM events WHERE id = ?",
    )
    .bind(event_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound("Event not found"))
}

async fn follows_either_way(db: &SqlitePool, a: &str, b: &str) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM follows
         WHERE (follower_id = ? AND followee_id = ?) OR (follower_id = ? AND followee_id = ?)",
    )
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

async fn has_blocked(db: &SqlitePool, blocker: &str, blocked: &str) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM blocks WHERE blocker_id = ? AND blocked_id = ?",
    )
    .bind(blocker)
    .bind(blocked)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

fn deny(reason: &'static str, denial: Denial) -> AppError {
    tracing::debug!(reason, code = denial.code(), "Direct message denied");
    AppError::Forbidden(denial)
}

/// Decide whether `sender_id` may message `recipient`.
///
/// Checks run in a fixed order and the first failure wins: self, banned,
/// opt-in, inbound policy, then the recipient's block list.
pub async fn check_direct_message(
    db: &SqlitePool,
    sender_id: &str,
    recipient: &UserPrivacy,
) -> AppResult<()> {
    if sender_id == recipient.id {
        return Err(AppError::Conflict("Cannot message yourself"));
    }
    if recipient.is_banned {
        return Err(AppError::NotFound("User not found"));
    }
    if !recipient.dm_opt_in {
        return Err(deny("recipient_opted_out", Denial::DmNotAllowed));
    }

    match recipient.dm_policy {
        DmPolicy::Everyone => {}
        DmPolicy::Nobody => return Err(deny("policy_nobody", Denial::DmNotAllowed)),
        DmPolicy::Followers => {
            if !follows_either_way(db, sender_id, &recipient.id).await? {
                return Err(deny("policy_followers", Denial::DmNotAllowed));
            }
        }
    }

    if has_blocked(db, &recipient.id, sender_id).await? {
        return Err(deny("sender_blocked", Denial::Blocked));
    }

    Ok(())
}

/// Outcome of the private-event check for a caller who is not revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventGate {
    Granted,
    Locked,
}

async fn is_revoked(db: &SqlitePool, event_id: &str, user_id: &str) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM event_revocations WHERE event_id = ? AND user_id = ?",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

async fn is_participant(db: &SqlitePool, event_id: &str, user_id: &str) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM event_participants WHERE event_id = ? AND user_id = ?",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

/// Public events are always open. For private events revocation is
/// checked first and outranks everything else, including organizer status.
pub async fn event_gate(db: &SqlitePool, actor_id: &str, event: &Event) -> AppResult<EventGate> {
    if !event.is_private {
        return Ok(EventGate::Granted);
    }
    if is_revoked(db, &event.id, actor_id).await? {
        tracing::debug!(event_id = %event.id, actor = %actor_id, "Revoked actor refused");
        return Err(AppError::Forbidden(Denial::AccessRevoked));
    }
    if event.organizer_id == actor_id || is_participant(db, &event.id, actor_id).await? {
        return Ok(EventGate::Granted);
    }

    // Unlocked earlier with the access code.
    if let Some(room) = identity::find_event_room(db, &event.id).await? {
        if identity::is_member(db, &room.id, actor_id).await? {
            return Ok(EventGate::Granted);
        }
    }

    Ok(EventGate::Locked)
}

/// Check that `actor_id` may read `room`, joining it lazily where the
/// room is open to them.
pub async fn authorize_room_read(db: &SqlitePool, actor_id: &str, room: &Room) -> AppResult<()> {
    match room.kind {
        RoomKind::Event => {
            let event_id = room
                .event_id
                .as_deref()
                .ok_or_else(|| AppError::Internal(format!("event room {} has no event", room.id)))?;
            let event = load_event(db, event_id).await?;
            match event_gate(db, actor_id, &event).await? {
                EventGate::Granted => identity::ensure_membership(db, &room.id, actor_id).await,
                EventGate::Locked => Err(AppError::Forbidden(Denial::RoomLocked)),
            }
        }
        RoomKind::Topic => {
            if !room.is_private {
                return identity::ensure_membership(db, &room.id, actor_id).await;
            }
            if identity::is_member(db, &room.id, actor_id).await? {
                Ok(())
            } else {
                Err(AppError::Forbidden(Denial::NotMember))
            }
        }
        RoomKind::Dm => {
            if identity::is_member(db, &room.id, actor_id).await? {
                Ok(())
            } else {
                Err(AppError::Forbidden(Denial::NotMember))
            }
        }
    }
}

/// Archived rooms and rooms past their window refuse posts. Only the
/// upper bound of the window is enforced.
pub fn check_post_window(room: &Room, now: &str) -> AppResult<()> {
    if room.is_archived {
        return Err(AppError::WindowClosed("Room is archived"));
    }
    if let Some(until) = room.active_until.as_deref() {
        if now > until {
            return Err(AppError::WindowClosed("Room is closed"));
        }
    }
    Ok(())
}

/// Full check for posting: window first, then read access, then for
/// direct rooms the counterpart's messaging settings.
pub async fn authorize_room_post(db: &SqlitePool, actor_id: &str, room: &Room) -> AppResult<()> {
    check_post_window(room, &db::now())?;
    authorize_room_read(db, actor_id, room).await?;

    if room.kind == RoomKind::Dm {
        let other = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM room_members WHERE room_id = ? AND user_id != ? LIMIT 1",
        )
        .bind(&room.id)
        .bind(actor_id)
        .fetch_optional(db)
        .await?;

        if let Some(other) = other {
            let peer = load_user_privacy(db, &other).await?;
            check_direct_message(db, actor_id, &peer).await?;
        }
    }

    Ok(())
}
