//! HTTP route handlers.

pub mod groups;
pub mod health;
pub mod trades;
pub mod users;
