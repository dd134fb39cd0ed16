//! Repository implementations for database operations.

pub mod group;
pub mod trade;
pub mod user;

pub use group::GroupRepository;
pub use trade::TradeRepository;
pub use user::UserRepository;
