use serde::Serialize;
use sqlx::SqlitePool;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{DirectMessage, Page, RoomMessage};

/// Position in a newest-first timeline.
///
/// Encoded as `<createdAt>|<seq>`. The sequence number breaks ties between
/// messages sharing a timestamp. A bare timestamp means "strictly older
/// than this instant".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: String,
    pub seq: Option<i64>,
}

impl Cursor {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let invalid = || AppError::InvalidInput("Invalid cursor".into());

        let (ts, seq) = match raw.split_once('|') {
            Some((ts, seq)) => (ts, Some(seq.parse::<i64>().map_err(|_| invalid())?)),
            None => (raw, None),
        };

        Ok(Self {
            created_at: db::normalize_timestamp(ts).ok_or_else(invalid)?,
            seq,
        })
    }

    pub fn encode(created_at: &str, seq: i64) -> String {
        format!("{}|{}", created_at, seq)
    }

    /// Sequence bound for the tie-break clause. With no sequence nothing at
    /// the cursor's exact instant qualifies.
    fn seq_bound(&self) -> i64 {
        self.seq.unwrap_or(i64::MIN)
    }
}

pub trait Timeline {
    fn created_at(&self) -> &str;
    fn seq(&self) -> i64;
}

impl Timeline for DirectMessage {
    fn created_at(&self) -> &str {
        &self.created_at
    }
    fn seq(&self) -> i64 {
        self.seq
    }
}

impl Timeline for RoomMessage {
    fn created_at(&self) -> &str {
        &self.created_at
    }
    fn seq(&self) -> i64 {
        self.seq
    }
}

/// Turn `limit + 1` newest-first rows into a page. The extra row only
/// signals that an older page exists.
pub fn into_page<T: Timeline + Serialize>(mut rows: Vec<T>, limit: i64) -> Page<T> {
    let has_more = rows.len() as i64 > limit;
    if has_more {
        rows.pop();
    }

    let next_cursor = if has_more {
        rows.last().map(|m| Cursor::encode(m.created_at(), m.seq()))
    } else {
        None
    };

    Page {
        items: rows,
        next_cursor,
    }
}

// ── Direct messages ──

pub async fn append_direct(
    db: &SqlitePool,
    thread_key: &str,
    sender_id: &str,
    recipient_id: &str,
    text: &str,
) -> AppResult<DirectMessage> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = db::now();

    let result = sqlx::query(
        r#"INSERT INTO direct_messages (id, thread_key, sender_id, recipient_id, text, created_at, read_at)
           VALUES (?, ?, ?, ?, ?, ?, NULL)"#,
    )
    .bind(&id)
    .bind(thread_key)
    .bind(sender_id)
    .bind(recipient_id)
    .bind(text)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(DirectMessage {
        seq: result.last_insert_rowid(),
        id,
        thread_key: thread_key.to_string(),
        sender_id: sender_id.to_string(),
        recipient_id: recipient_id.to_string(),
        text: text.to_string(),
        created_at: now,
        read_at: None,
    })
}

pub async fn page_direct(
    db: &SqlitePool,
    thread_key: &str,
    before: Option<&Cursor>,
    limit: i64,
) -> AppResult<Page<DirectMessage>> {
    let rows = if let Some(cursor) = before {
        sqlx::query_as::<_, DirectMessage>(
            "SELECT * FROM direct_messages
             WHERE thread_key = ? AND (created_at < ? OR (created_at = ? AND seq < ?))
             ORDER BY created_at DESC, seq DESC LIMIT ?",
        )
        .bind(thread_key)
        .bind(&cursor.created_at)
        .bind(&cursor.created_at)
        .bind(cursor.seq_bound())
        .bind(limit + 1)
        .fetch_all(db)
        .await?
    } else {
        sqlx::query_as::<_, DirectMessage>(
            "SELECT * FROM direct_messages WHERE thread_key = ? ORDER BY created_at DESC, seq DESC LIMIT ?",
        )
        .bind(thread_key)
        .bind(limit + 1)
        .fetch_all(db)
        .await?
    };

    Ok(into_page(rows, limit))
}

/// Mark every unread message addressed to `reader` in the thread, created
/// at or before `up_to`, as read. Already-read rows are left alone, so
/// repeating the call changes nothing.
pub async fn mark_direct_read(
    db: &SqlitePool,
    thread_key: &str,
    reader_id: &str,
    up_to: &str,
) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE direct_messages SET read_at = ?
         WHERE thread_key = ? AND recipient_id = ? AND read_at IS NULL AND created_at <= ?",
    )
    .bind(db::now())
    .bind(thread_key)
    .bind(reader_id)
    .bind(up_to)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

/// Mark specific messages read for `reader`. Used after a page fetch so
/// only what the reader actually received flips.
pub async fn mark_direct_ids_read(
    db: &SqlitePool,
    reader_id: &str,
    ids: &[&str],
    read_at: &str,
) -> AppResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders: Vec<String> = ids.iter().map(|_| "?".to_string()).collect();
    let sql = format!(
        "UPDATE direct_messages SET read_at = ? WHERE recipient_id = ? AND read_at IS NULL AND id IN ({})",
        placeholders.join(",")
    );

    let mut query = sqlx::query(&sql).bind(read_at).bind(reader_id);
    for id in ids {
        query = query.bind(*id);
    }

    Ok(query.execute(db).await?.rows_affected())
}

// ── Rooms ──

pub async fn append_room(
    db: &SqlitePool,
    room_id: &str,
    sender_id: &str,
    text: &str,
) -> AppResult<RoomMessage> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = db::now();

    let result = sqlx::query(
        "INSERT INTO room_messages (id, room_id, sender_id, text, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(room_id)
    .bind(sender_id)
    .bind(text)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(RoomMessage {
        seq: result.last_insert_rowid(),
        id,
        room_id: room_id.to_string(),
        sender_id: sender_id.to_string(),
        text: text.to_string(),
        created_at: now,
    })
}

pub async fn page_room(
    db: &SqlitePool,
    room_id: &str,
    before: Option<&Cursor>,
    limit: i64,
) -> AppResult<Page<RoomMessage>> {
    let rows = if let Some(cursor) = before {
        sqlx::query_as::<_, RoomMessage>(
            "SELECT * FROM room_messages
             WHERE room_id = ? AND (created_at < ? OR (created_at = ? AND seq < ?))
             ORDER BY created_at DESC, seq DESC LIMIT ?",
        )
        .bind(room_id)
        .bind(&cursor.created_at)
        .bind(&cursor.created_at)
        .bind(cursor.seq_bound())
        .bind(limit + 1)
        .fetch_all(db)
        .await?
    } else {
        sqlx::query_as::<_, RoomMessage>(
            "SELECT * FROM room_messages WHERE room_id = ? ORDER BY created_at DESC, seq DESC LIMIT ?",
        )
        .bind(room_id)
        .bind(limit + 1)
        .fetch_all(db)
        .await?
    };

    Ok(into_page(rows, limit))
}

/// Move the member's read cursor forward to `up_to`. A cursor already at or
/// past `up_to` is left where it is. Returns whether the cursor moved.
pub async fn advance_read_cursor(
    db: &SqlitePool,
    room_id: &str,
    user_id: &str,
    up_to: &str,
) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE room_members SET last_read_at = ?
         WHERE room_id = ? AND user_id = ? AND (last_read_at IS NULL OR last_read_at < ?)",
    )
    .bind(up_to)
    .bind(room_id)
    .bind(user_id)
    .bind(up_to)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn touch_room(db: &SqlitePool, room_id: &str, at: &str) -> AppResult<()> {
    sqlx::query("UPDATE rooms SET updated_at = ? WHERE id = ? AND updated_at < ?")
        .bind(at)
        .bind(room_id)
        .bind(at)
        .execute(db)
        .await?;
    Ok(())
}
