//! Start-time reminders for trades nobody has claimed.
//!
//! One sweep looks at the window `[now + 5h, now + 5h10m)`. With sweeps ten
//! minutes apart each OPEN trade normally lands in exactly one window; a
//! delayed or skipped sweep may remind a trade zero or several times.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::services::messages::MessageFormatter;
use crate::services::notification::Notifier;
use crate::store::{StoreError, TradeStore};

/// Sweep period, which is also the window width.
pub const SWEEP_INTERVAL_MINUTES: i64 = 10;

/// How far ahead of the shift start the reminder fires.
pub const REMINDER_LEAD_HOURS: i64 = 5;

/// Half-open window `[from, until)` scanned by a sweep at `now`.
pub fn reminder_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = now + Duration::hours(REMINDER_LEAD_HOURS);
    (from, from + Duration::minutes(SWEEP_INTERVAL_MINUTES))
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub candidates: usize,
    pub reminded: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ReminderSweeper {
    store: Arc<dyn TradeStore>,
    notifier: Notifier,
    messages: MessageFormatter,
}

impl ReminderSweeper {
    pub fn new(store: Arc<dyn TradeStore>, notifier: Notifier, messages: MessageFormatter) -> Self {
        Self {
            store,
            notifier,
            messages,
        }
    }

    /// Run one sweep as of `now`. Each reminder is awaited so its outcome
    /// belongs to this sweep. A store error aborts the sweep only.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let (from, until) = reminder_window(now);
        let targets = self
            .store
            .unfilled_trades_starting_between(from, until)
            .await?;

        let mut report = SweepReport {
            candidates: targets.len(),
            ..Default::default()
        };

        for target in &targets {
            let text = self.messages.reminder(target.shift_start_at);
            let outcome = self
                .notifier
                .send(&target.requester_external_id, &text)
                .await;
            if outcome.delivered > 0 {
                tracing::info!(trade_id = %target.trade_id, "Sent start-time reminder");
                report.reminded += 1;
            } else if outcome.failed > 0 {
                tracing::warn!(trade_id = %target.trade_id, "Failed to send start-time reminder");
                report.failed += 1;
            } else {
                report.skipped += 1;
            }
        }

        Ok(report)
    }
}
