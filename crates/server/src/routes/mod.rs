pub mod dms;
pub mod rooms;
pub mod users;

use crate::AppState;
use axum::{routing::{get, post, put}, Json, Router};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Direct messages
        .route("/dms", get(dms::list_threads))
        .route("/dms/unread", get(dms::unread_count))
        .route("/dms/{peerId}/messages", post(dms::send_direct_message))
        .route("/dms/{peerId}/messages", get(dms::list_direct_messages))
        .route("/dms/{peerId}/read", post(dms::mark_thread_read))
        // Event rooms
        .route("/events/{eventId}/room", post(rooms::open_event_room))
        .route("/events/{eventId}/room/unlock", post(rooms::unlock_event_room))
        // Rooms
        .route("/rooms/direct", post(rooms::create_direct_room))
        .route("/rooms/topic", post(rooms::create_topic_room))
        .route("/rooms/mine", get(rooms::list_my_rooms))
        .route("/rooms/unread", get(rooms::unread_rooms))
        .route("/rooms/{roomId}/messages", get(rooms::list_room_messages))
        .route("/rooms/{roomId}/messages", post(rooms::post_room_message))
        .route("/rooms/{roomId}/read", post(rooms::mark_room_read))
        .route("/rooms/{roomId}/archive", post(rooms::archive_room))
        // Users
        .route("/users/me/privacy", get(users::get_privacy).patch(users::update_privacy))
        .route("/users/{userId}/block", put(users::block_user).delete(users::unblock_user))
        .route("/users/{userId}/follow", put(users::follow_user).delete(users::unfollow_user));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(|| async { Json(serde_json::json!({"status": "ok"})) }))
        .with_state(state)
}
