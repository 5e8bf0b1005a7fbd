use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    #[serde(skip_serializing)]
    pub seq: i64,
    pub id: String,
    pub thread_key: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub text: String,
    pub created_at: String,
    pub read_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    #[serde(skip_serializing)]
    pub seq: i64,
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentDirectMessage {
    pub id: String,
    pub thread_key: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentRoomMessage {
    pub id: String,
    pub room_id: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub thread_key: String,
    pub counterpart: super::UserSummary,
    pub last_message: DirectMessage,
    pub unread_count: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub up_to: Option<String>,
}
