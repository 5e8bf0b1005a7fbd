/// Event record as seen by the room gate. Events themselves are managed elsewhere.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub organizer_id: String,
    pub is_private: bool,
    pub access_code: Option<String>,
    pub starts_at: String,
    pub ends_at: Option<String>,
}
