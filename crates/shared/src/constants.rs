pub const APP_NAME: &str = "Gather";

// Limits
pub const MAX_MESSAGE_LENGTH: usize = 2000;
pub const MAX_ROOM_TITLE_LENGTH: usize = 120;

pub const DM_PAGE_SIZE: i64 = 30;
pub const DM_PAGE_MAX: i64 = 100;
pub const ROOM_PAGE_SIZE: i64 = 50;
pub const ROOM_PAGE_MAX: i64 = 100;
pub const THREAD_PAGE_SIZE: i64 = 20;
pub const THREAD_PAGE_MAX: i64 = 50;

/// Per-room unread counts saturate at this value.
pub const UNREAD_COUNT_CAP: i64 = 1000;
pub const MY_ROOMS_LIMIT: i64 = 50;
