//! Entity definitions (database row mappings).

pub mod group;
pub mod trade;
pub mod user;

pub use group::{GroupEntity, GroupMemberEntity, GroupRoleDb};
pub use trade::{ReminderTargetEntity, TradeEntity, TradeStatusDb};
pub use user::UserEntity;
