//! Domain models for the shift trade backend.

pub mod group;
pub mod trade;
pub mod user;

pub use group::{Group, GroupRole, Membership};
pub use trade::{NewTrade, ReminderTarget, Trade, TradeStatus};
pub use user::User;
