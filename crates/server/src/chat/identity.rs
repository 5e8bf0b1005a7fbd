use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{Event, Room, RoomKind};

/// Order-independent key for the conversation between two users.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}-{}", a, b)
    } else {
        format!("{}-{}", b, a)
    }
}

pub async fn find_room(db: &SqlitePool, room_id: &str) -> AppResult<Room> {
    sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(room_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound("Room not found"))
}

pub async fn find_event_room(db: &SqlitePool, event_id: &str) -> AppResult<Option<Room>> {
    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE kind = 'event' AND event_id = ?")
        .bind(event_id)
        .fetch_optional(db)
        .await?;
    Ok(room)
}

/// The room window opens a fixed lead before the event and closes a fixed
/// grace after it ends. Events without an end close relative to their start.
pub fn event_window(event: &Event, config: &Config) -> (Option<String>, Option<String>) {
    let parse = |raw: &str| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.with_timezone(&Utc));

    let Some(start) = parse(&event.starts_at) else {
        tracing::warn!(event_id = %event.id, "Event has an unparseable start time, room window left open");
        return (None, None);
    };
    let end = event.ends_at.as_deref().and_then(parse).unwrap_or(start);

    (
        Some(db::timestamp(start - Duration::hours(config.room_open_lead_hours))),
        Some(db::timestamp(end + Duration::hours(config.room_close_grace_hours))),
    )
}

/// Look up the event's room, creating it on first access.
pub async fn find_or_create_event_room(
    db: &SqlitePool,
    event: &Event,
    config: &Config,
) -> AppResult<Room> {
    if let Some(room) = find_event_room(db, &event.id).await? {
        return Ok(room);
    }

    let (active_from, active_until) = event_window(event, config);
    let now = db::now();

    // A concurrent creator may win; the unique index keeps one row.
    sqlx::query(
        r#"INSERT OR IGNORE INTO rooms
           (id, kind, event_id, title, is_private, is_archived, active_from, active_until, created_by, created_at, updated_at)
           VALUES (?, 'event', ?, NULL, ?, 0, ?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&event.id)
    .bind(event.is_private)
    .bind(&active_from)
    .bind(&active_until)
    .bind(&event.organizer_id)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    find_event_room(db, &event.id)
        .await?
        .ok_or_else(|| AppError::Internal("event room missing after insert".into()))
}

/// Look up the direct room for a pair, creating it with both memberships.
pub async fn find_or_create_dm_room(db: &SqlitePool, creator: &str, other: &str) -> AppResult<Room> {
    let key = pair_key(creator, other);
    let now = db::now();

    sqlx::query(
        r#"INSERT OR IGNORE INTO rooms
           (id, kind, dm_key, is_private, is_archived, created_by, created_at, updated_at)
           VALUES (?, 'dm', ?, 1, 0, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&key)
    .bind(creator)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE kind = 'dm' AND dm_key = ?")
        .bind(&key)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::Internal("dm room missing after insert".into()))?;

    ensure_membership(db, &room.id, creator).await?;
    ensure_membership(db, &room.id, other).await?;

    Ok(room)
}

pub async fn create_topic_room(
    db: &SqlitePool,
    creator: &str,
    title: &str,
    is_private: bool,
    active_until: Option<&str>,
) -> AppResult<Room> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = db::now();

    sqlx::query(
        r#"INSERT INTO rooms
           (id, kind, title, is_private, is_archived, active_from, active_until, created_by, created_at, updated_at)
           VALUES (?, 'topic', ?, ?, 0, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(title)
    .bind(is_private)
    .bind(&now)
    .bind(active_until)
    .bind(creator)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    ensure_membership(db, &id, creator).await?;

    Ok(Room {
        id,
        kind: RoomKind::Topic,
        event_id: None,
        dm_key: None,
        title: Some(title.to_string()),
        is_private,
        is_archived: false,
        active_from: Some(now.clone()),
        active_until: active_until.map(str::to_string),
        created_by: creator.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Insert the membership row if it does not exist yet. Never touches an
/// existing row, so the read cursor is preserved.
pub async fn ensure_membership(db: &SqlitePool, room_id: &str, user_id: &str) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO room_members (room_id, user_id, joined_at, last_read_at) VALUES (?, ?, ?, NULL)
         ON CONFLICT(room_id, user_id) DO NOTHING",
    )
    .bind(room_id)
    .bind(user_id)
    .bind(db::now())
    .execute(db)
    .await?;
    Ok(())
}

pub async fn is_member(db: &SqlitePool, room_id: &str, user_id: &str) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM room_members WHERE room_id = ? AND user_id = ?",
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn archive_room(db: &SqlitePool, room_id: &str) -> AppResult<()> {
    sqlx::query("UPDATE rooms SET is_archived = 1, updated_at = ? WHERE id = ?")
        .bind(db::now())
        .bind(room_id)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_ignores_argument_order() {
        assert_eq!(pair_key("alice", "bob"), pair_key("bob", "alice"));
        assert_eq!(pair_key("alice", "bob"), "alice-bob");
    }

    #[test]
    fn pair_key_distinguishes_pairs() {
        let pairs = [("a", "b"), ("a", "c"), ("b", "c"), ("ab", "c"), ("a", "bc")];
        let keys: std::collections::HashSet<_> =
            pairs.iter().map(|(x, y)| pair_key(x, y)).collect();
        assert_eq!(keys.len(), pairs.len());
    }

    fn event(starts_at: &str, ends_at: Option<&str>) -> Event {
        Event {
            id: "ev".into(),
            title: "Meetup".into(),
            organizer_id: "org".into(),
            is_private: false,
            access_code: None,
            starts_at: starts_at.into(),
            ends_at: ends_at.map(str::to_string),
        }
    }

    fn config() -> Config {
        let mut config = Config::from_env();
        config.room_open_lead_hours = 2;
        config.room_close_grace_hours = 6;
        config
    }

    #[test]
    fn window_brackets_the_event() {
        let (from, until) = event_window(
            &event("2026-05-01T18:00:00Z", Some("2026-05-01T22:00:00Z")),
            &config(),
        );
        assert_eq!(from.as_deref(), Some("2026-05-01T16:00:00.000000Z"));
        assert_eq!(until.as_deref(), Some("2026-05-02T04:00:00.000000Z"));
    }

    #[test]
    fn window_without_end_closes_after_start() {
        let (_, until) = event_window(&event("2026-05-01T18:00:00Z", None), &config());
        assert_eq!(until.as_deref(), Some("2026-05-02T00:00:00.000000Z"));
    }
}
