//! Read-state views computed on demand from the message tables.
//!
//! Direct messages are unread while their `read_at` is null. Room unread
//! state compares a member's `last_read_at` against message timestamps,
//! with a missing cursor treated as the beginning of time. Rooms the user
//! has no membership in never show up here.

use std::collections::HashMap;

use gather_shared::constants::{MY_ROOMS_LIMIT, UNREAD_COUNT_CAP};
use sqlx::SqlitePool;

use super::store::{into_page, Cursor};
use crate::error::AppResult;
use crate::models::{
    DirectMessage, MyRoom, Page, RoomKind, RoomUnread, ThreadSummary, UnreadRoomsSummary,
    UserSummary,
};

/// Lower bound standing in for a null read cursor. Sorts before every
/// stored timestamp.
const EPOCH: &str = "";

/// Unread direct messages addressed to the user. Messages from banned
/// senders are left out.
pub async fn direct_unread_count(db: &SqlitePool, user_id: &str) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM direct_messages d
           JOIN "user" u ON u.id = d.sender_id
           WHERE d.recipient_id = ? AND d.read_at IS NULL AND u.is_banned = 0"#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

async fn user_summary(db: &SqlitePool, user_id: &str) -> AppResult<Option<UserSummary>> {
    let user = sqlx::query_as::<_, UserSummary>(r#"SELECT id, username, image FROM "user" WHERE id = ?"#)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

/// The user's direct threads, most recent first, each with its latest
/// message and the user's unread count in it.
pub async fn list_threads(
    db: &SqlitePool,
    user_id: &str,
    before: Option<&Cursor>,
    limit: i64,
) -> AppResult<Page<ThreadSummary>> {
    // Newest row per thread by (created_at, seq), skipping banned counterparts.
    const LATEST_PER_THREAD: &str = r#"
        SELECT seq, id, thread_key, sender_id, recipient_id, text, created_at, read_at FROM (
            SELECT d.*, ROW_NUMBER() OVER (
                PARTITION BY d.thread_key ORDER BY d.created_at DESC, d.seq DESC
            ) AS rn
            FROM direct_messages d
            JOIN "user" u
              ON u.id = CASE WHEN d.sender_id = ? THEN d.recipient_id ELSE d.sender_id END
            WHERE (d.sender_id = ? OR d.recipient_id = ?) AND u.is_banned = 0
        )
        WHERE rn = 1"#;

    let latest = if let Some(cursor) = before {
        let sql = format!(
            "{} AND (created_at < ? OR (created_at = ? AND seq < ?))
             ORDER BY created_at DESC, seq DESC LIMIT ?",
            LATEST_PER_THREAD
        );
        sqlx::query_as::<_, DirectMessage>(&sql)
            .bind(user_id)
            .bind(user_id)
            .bind(user_id)
            .bind(&cursor.created_at)
            .bind(&cursor.created_at)
            .bind(cursor.seq.unwrap_or(i64::MIN))
            .bind(limit + 1)
            .fetch_all(db)
            .await?
    } else {
        let sql = format!("{} ORDER BY created_at DESC, seq DESC LIMIT ?", LATEST_PER_THREAD);
        sqlx::query_as::<_, DirectMessage>(&sql)
            .bind(user_id)
            .bind(user_id)
            .bind(user_id)
            .bind(limit + 1)
            .fetch_all(db)
            .await?
    };

    let page = into_page(latest, limit);

    let unread: HashMap<String, i64> = sqlx::query_as::<_, (String, i64)>(
        "SELECT thread_key, COUNT(*) FROM direct_messages
         WHERE recipient_id = ? AND read_at IS NULL GROUP BY thread_key",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?
    .into_iter()
    .collect();

    let mut items = Vec::with_capacity(page.items.len());
    for last_message in page.items {
        let counterpart_id = if last_message.sender_id == user_id {
            &last_message.recipient_id
        } else {
            &last_message.sender_id
        };

        let Some(counterpart) = user_summary(db, counterpart_id).await? else {
            continue;
        };

        items.push(ThreadSummary {
            thread_key: last_message.thread_key.clone(),
            unread_count: unread.get(&last_message.thread_key).copied().unwrap_or(0),
            counterpart,
            last_message,
        });
    }

    Ok(Page {
        items,
        next_cursor: page.next_cursor,
    })
}

/// Messages in the room newer than `last_read_at`, saturating at
/// [`UNREAD_COUNT_CAP`]. Past the cap the true count is not computed.
pub async fn room_unread_count(
    db: &SqlitePool,
    room_id: &str,
    last_read_at: Option<&str>,
) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM (
            SELECT 1 FROM room_messages WHERE room_id = ? AND created_at > ? LIMIT ?
         )",
    )
    .bind(room_id)
    .bind(last_read_at.unwrap_or(EPOCH))
    .bind(UNREAD_COUNT_CAP)
    .fetch_one(db)
    .await?;
    Ok(count)
}

/// Whether the room's newest message is newer than the member's cursor.
pub async fn room_has_unread(db: &SqlitePool, room_id: &str, user_id: &str) -> AppResult<bool> {
    let unread = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS (
            SELECT 1 FROM room_members m
            JOIN room_messages msg ON msg.room_id = m.room_id
            WHERE m.room_id = ? AND m.user_id = ? AND msg.created_at > COALESCE(m.last_read_at, ?)
         )",
    )
    .bind(room_id)
    .bind(user_id)
    .bind(EPOCH)
    .fetch_one(db)
    .await?;
    Ok(unread != 0)
}

/// Number of non-archived event rooms the user belongs to that have unread messages.
pub async fn total_unread_rooms(db: &SqlitePool, user_id: &str) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM room_members m
         JOIN rooms r ON r.id = m.room_id
         WHERE m.user_id = ? AND r.kind = 'event' AND r.is_archived = 0
           AND EXISTS (
               SELECT 1 FROM room_messages msg
               WHERE msg.room_id = r.id AND msg.created_at > COALESCE(m.last_read_at, ?)
           )",
    )
    .bind(user_id)
    .bind(EPOCH)
    .fetch_one(db)
    .await?;
    Ok(count)
}

/// Unread count for every room the user belongs to, archived ones included.
pub async fn room_unread_summary(db: &SqlitePool, user_id: &str) -> AppResult<Vec<RoomUnread>> {
    let memberships = sqlx::query_as::<_, (String, Option<String>)>(
        "SELECT room_id, last_read_at FROM room_members
         WHERE user_id = ?
         ORDER BY joined_at",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let mut rooms = Vec::with_capacity(memberships.len());
    for (room_id, last_read_at) in memberships {
        let unread_count = room_unread_count(db, &room_id, last_read_at.as_deref()).await?;
        rooms.push(RoomUnread {
            room_id,
            unread_count,
        });
    }
    Ok(rooms)
}

pub async fn unread_rooms(db: &SqlitePool, user_id: &str) -> AppResult<UnreadRoomsSummary> {
    Ok(UnreadRoomsSummary {
        total_unread_rooms: total_unread_rooms(db, user_id).await?,
        rooms: room_unread_summary(db, user_id).await?,
    })
}

#[derive(Debug, sqlx::FromRow)]
struct MyRoomRow {
    id: String,
    kind: RoomKind,
    event_id: Option<String>,
    title: Option<String>,
    event_title: Option<String>,
    last_read_at: Option<String>,
    last_message_at: Option<String>,
    updated_at: String,
}

/// Every non-archived room the user belongs to, newest activity first.
/// With `only_active`, rooms nobody has posted in yet are left out.
pub async fn my_rooms(db: &SqlitePool, user_id: &str, only_active: bool) -> AppResult<Vec<MyRoom>> {
    let rows = sqlx::query_as::<_, MyRoomRow>(
        "SELECT * FROM (
            SELECT r.id, r.kind, r.event_id, r.title, e.title AS event_title,
                   m.last_read_at, r.updated_at,
                   (SELECT MAX(created_at) FROM room_messages WHERE room_id = r.id) AS last_message_at
            FROM room_members m
            JOIN rooms r ON r.id = m.room_id
            LEFT JOIN events e ON e.id = r.event_id
            WHERE m.user_id = ? AND r.is_archived = 0
         )
         WHERE ? = 0 OR last_message_at IS NOT NULL
         ORDER BY COALESCE(last_message_at, updated_at) DESC
         LIMIT ?",
    )
    .bind(user_id)
    .bind(only_active)
    .bind(MY_ROOMS_LIMIT)
    .fetch_all(db)
    .await?;

    let mut rooms = Vec::with_capacity(rows.len());
    for row in rows {
        let counterpart = if row.kind == RoomKind::Dm {
            sqlx::query_as::<_, UserSummary>(
                r#"SELECT u.id, u.username, u.image FROM room_members m
                   JOIN "user" u ON u.id = m.user_id
                   WHERE m.room_id = ? AND m.user_id != ? LIMIT 1"#,
            )
            .bind(&row.id)
            .bind(user_id)
            .fetch_optional(db)
            .await?
        } else {
            None
        };

        let title = row
            .title
            .clone()
            .or_else(|| row.event_title.clone())
            .or_else(|| counterpart.as_ref().map(|c| c.username.clone()))
            .unwrap_or_else(|| "Conversation".to_string());

        let unread_count = room_unread_count(db, &row.id, row.last_read_at.as_deref()).await?;

        rooms.push(MyRoom {
            has_messages: row.last_message_at.is_some(),
            last_activity_at: row.last_message_at.unwrap_or(row.updated_at),
            id: row.id,
            kind: row.kind,
            event_id: row.event_id,
            title,
            counterpart,
            unread_count,
        });
    }

    Ok(rooms)
}
