//! Domain services for shift trading.
//!
//! Services contain the business rules and talk to storage only through
//! [`crate::store::TradeStore`].

pub mod dispatch;
pub mod group;
pub mod identity;
pub mod messages;
pub mod notification;
pub mod reminder;
pub mod trade;
pub mod user;

pub use dispatch::NotificationDispatcher;
pub use group::GroupService;
pub use identity::{
    AuthStrategy, IdentityError, IdentityResolver, IdentityVerifier, MockIdentityVerifier,
    ResolvedIdentity, VerifyError,
};
pub use messages::MessageFormatter;
pub use notification::{
    FanoutReport, MockPushGateway, MulticastOutcome, Notifier, PushError, PushGateway,
};
pub use reminder::{reminder_window, ReminderSweeper, SweepReport};
pub use trade::{Actor, TradeService};
pub use user::UserService;
