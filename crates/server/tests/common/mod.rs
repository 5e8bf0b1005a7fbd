#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use gather_server::{
    config::{Config, LimitSettings},
    db, routes, AppState,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

/// Create an in-memory SQLite pool with schema applied.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    db::apply_schema(&pool).await.unwrap();
    pool
}

pub fn test_config() -> Config {
    let generous = LimitSettings {
        max: 10_000,
        window_ms: 60_000,
    };
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_path: ":memory:".into(),
        app_env: "test".into(),
        redis_url: None,
        rate_limit_namespace: "gather".into(),
        dm_send_limit: generous,
        room_post_limit: generous,
        room_unlock_limit: generous,
        room_open_lead_hours: 24,
        room_close_grace_hours: 48,
    }
}

/// Build a test Axum app with the given pool.
pub fn create_test_app(pool: SqlitePool) -> Router {
    create_test_app_with_config(pool, test_config())
}

pub fn create_test_app_with_config(pool: SqlitePool, config: Config) -> Router {
    routes::build_router(Arc::new(AppState::new(pool, config)))
}

pub async fn setup() -> (TestServer, SqlitePool) {
    let pool = setup_test_db().await;
    let app = create_test_app(pool.clone());
    let server = TestServer::new(app).unwrap();
    (server, pool)
}

pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        format!("Bearer {}", token).parse().unwrap(),
    )
}

pub fn ts(offset: Duration) -> String {
    db::timestamp(Utc::now() + offset)
}

/// Create a test user with a live session. Returns (user_id, session_token).
pub async fn create_test_user(pool: &SqlitePool, username: &str) -> (String, String) {
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = db::now();

    sqlx::query(r#"INSERT INTO "user" (id, username, created_at) VALUES (?, ?, ?)"#)
        .bind(&user_id)
        .bind(username)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();

    let session_token = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        r#"INSERT INTO "session" (id, user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&user_id)
    .bind(&session_token)
    .bind(ts(Duration::days(30)))
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    (user_id, session_token)
}

pub async fn set_privacy(pool: &SqlitePool, user_id: &str, opt_in: bool, policy: &str) {
    sqlx::query(r#"UPDATE "user" SET dm_opt_in = ?, dm_policy = ? WHERE id = ?"#)
        .bind(opt_in)
        .bind(policy)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn ban(pool: &SqlitePool, user_id: &str) {
    sqlx::query(r#"UPDATE "user" SET is_banned = 1 WHERE id = ?"#)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn follow(pool: &SqlitePool, follower: &str, followee: &str) {
    sqlx::query("INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)")
        .bind(follower)
        .bind(followee)
        .bind(db::now())
        .execute(pool)
        .await
        .unwrap();
}

pub async fn block(pool: &SqlitePool, blocker: &str, blocked: &str) {
    sqlx::query("INSERT INTO blocks (blocker_id, blocked_id, created_at) VALUES (?, ?, ?)")
        .bind(blocker)
        .bind(blocked)
        .bind(db::now())
        .execute(pool)
        .await
        .unwrap();
}

pub struct EventSpec<'a> {
    pub title: &'a str,
    pub is_private: bool,
    pub access_code: Option<&'a str>,
    pub starts_in: Duration,
    pub lasts: Duration,
}

impl Default for EventSpec<'_> {
    fn default() -> Self {
        Self {
            title: "Rooftop meetup",
            is_private: false,
            access_code: None,
            starts_in: Duration::days(1),
            lasts: Duration::hours(3),
        }
    }
}

pub async fn create_event(pool: &SqlitePool, organizer_id: &str, spec: EventSpec<'_>) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO events (id, title, organizer_id, is_private, access_code, starts_at, ends_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(spec.title)
    .bind(organizer_id)
    .bind(spec.is_private)
    .bind(spec.access_code)
    .bind(ts(spec.starts_in))
    .bind(ts(spec.starts_in + spec.lasts))
    .bind(db::now())
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn add_participant(pool: &SqlitePool, event_id: &str, user_id: &str) {
    sqlx::query("INSERT INTO event_participants (event_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(event_id)
        .bind(user_id)
        .bind(db::now())
        .execute(pool)
        .await
        .unwrap();
}

pub async fn revoke(pool: &SqlitePool, event_id: &str, user_id: &str) {
    sqlx::query("INSERT INTO event_revocations (event_id, user_id, revoked_at) VALUES (?, ?, ?)")
        .bind(event_id)
        .bind(user_id)
        .bind(db::now())
        .execute(pool)
        .await
        .unwrap();
}

/// Insert a room message with an explicit timestamp, bypassing the API.
pub async fn insert_room_message(
    pool: &SqlitePool,
    room_id: &str,
    sender_id: &str,
    created_at: &str,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO room_messages (id, room_id, sender_id, text, created_at) VALUES (?, ?, ?, 'seeded', ?)",
    )
    .bind(&id)
    .bind(room_id)
    .bind(sender_id)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Insert a direct message with an explicit timestamp, bypassing the API.
pub async fn insert_direct_message(
    pool: &SqlitePool,
    sender_id: &str,
    recipient_id: &str,
    text: &str,
    created_at: &str,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO direct_messages (id, thread_key, sender_id, recipient_id, text, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(gather_server::chat::pair_key(sender_id, recipient_id))
    .bind(sender_id)
    .bind(recipient_id)
    .bind(text)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Open the event room as the token's user and return the room id.
pub async fn open_event_room(server: &TestServer, token: &str, event_id: &str) -> String {
    let (h, v) = auth_header(token);
    let res = server
        .post(&format!("/api/events/{}/room", event_id))
        .add_header(h, v)
        .await;
    res.assert_status_ok();
    let body: serde_json::Value = res.json();
    body["id"].as_str().expect("room id").to_string()
}
