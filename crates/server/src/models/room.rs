use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RoomKind {
    Event,
    Topic,
    Dm,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub kind: RoomKind,
    pub event_id: Option<String>,
    #[serde(skip_serializing)]
    pub dm_key: Option<String>,
    pub title: Option<String>,
    pub is_private: bool,
    pub is_archived: bool,
    pub active_from: Option<String>,
    pub active_until: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of opening an event room: either the room or a locked marker.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RoomAccess {
    Open(Room),
    Locked { locked: bool },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyRoom {
    pub id: String,
    pub kind: RoomKind,
    pub event_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterpart: Option<super::UserSummary>,
    pub last_activity_at: String,
    pub has_messages: bool,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUnread {
    pub room_id: String,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadRoomsSummary {
    pub total_unread_rooms: i64,
    pub rooms: Vec<RoomUnread>,
}

#[derive(Debug, Deserialize)]
pub struct UnlockRoomRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectRoomRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopicRoomRequest {
    pub title: String,
    #[serde(default)]
    pub is_private: bool,
    pub active_until: Option<String>,
}
