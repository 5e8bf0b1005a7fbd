//! Direct messages, rooms, read tracking and the gate in front of them.

pub mod access;
pub mod identity;
pub mod store;
pub mod unread;

pub use identity::pair_key;
pub use store::Cursor;
