//! Background job scheduler and job implementations.

mod scheduler;
mod trade_reminder;

pub use scheduler::{Job, JobFrequency, JobScheduler};
pub use trade_reminder::TradeReminderJob;
