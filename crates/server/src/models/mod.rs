mod event;
mod message;
mod room;
mod user;

pub use event::*;
pub use message::*;
pub use room::*;
pub use user::*;

use serde::Serialize;

/// One page of a newest-first listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
}
