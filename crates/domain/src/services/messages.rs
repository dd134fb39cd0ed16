//! Human-readable notification texts.

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Default display offset (UTC+9).
pub const DEFAULT_DISPLAY_OFFSET_HOURS: i32 = 9;

/// Name used when the acceptor's profile cannot be loaded.
pub const FALLBACK_MEMBER_NAME: &str = "a member";

/// Renders notification bodies with times shown in a fixed display offset.
#[derive(Debug, Clone, Copy)]
pub struct MessageFormatter {
    offset: FixedOffset,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_OFFSET_HOURS).unwrap_or(Self { offset: Utc.fix() })
    }
}

impl MessageFormatter {
    /// `None` if the offset is outside what a time zone can carry.
    pub fn new(utc_offset_hours: i32) -> Option<Self> {
        FixedOffset::east_opt(utc_offset_hours.checked_mul(3600)?).map(|offset| Self { offset })
    }

    /// `MM/DD HH:MM ~ HH:MM` for a same-day shift, full dates otherwise.
    pub fn shift_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        let s = start.with_timezone(&self.offset);
        let e = end.with_timezone(&self.offset);
        if s.date_naive() == e.date_naive() {
            format!("{} ~ {}", s.format("%m/%d %H:%M"), e.format("%H:%M"))
        } else {
            format!("{} ~ {}", s.format("%m/%d %H:%M"), e.format("%m/%d %H:%M"))
        }
    }

    pub fn shift_date(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%m/%d").to_string()
    }

    pub fn shift_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%H:%M").to_string()
    }

    /// Broadcast to the group when a trade is posted.
    pub fn new_trade(
        &self,
        group_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bounty: &str,
    ) -> String {
        format!(
            "📢 New shift up for grabs!\n\nGroup: {}\n\nWhen: {}\nBounty: {}\n\nOpen the app to take a look!",
            group_name,
            self.shift_range(start, end),
            bounty
        )
    }

    /// To the requester when someone claims their trade.
    pub fn trade_filled(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        acceptor_name: Option<&str>,
    ) -> String {
        format!(
            "🎉 Your shift has been covered!\n\nWhen: {}\nCovered by: {}\n\nAdding handover notes on the trade page helps things go smoothly.",
            self.shift_range(start, end),
            acceptor_name.unwrap_or(FALLBACK_MEMBER_NAME)
        )
    }

    /// To the acceptor after a successful claim.
    pub fn claim_confirmed(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "👍 You took the shift!\n\nWhen: {}\nThanks for covering!",
            self.shift_range(start, end)
        )
    }

    /// To the acceptor when the requester records payment.
    pub fn payment_recorded(&self, requester_name: &str, start: DateTime<Utc>) -> String {
        format!(
            "💰 Payment recorded!\n\nPaid by: {}\nShift: {}\n\nPlease check that you received it.",
            requester_name,
            self.shift_date(start)
        )
    }

    /// Urgent reminder for a trade still open close to its start.
    pub fn reminder(&self, start: DateTime<Utc>) -> String {
        format!(
            "⚠️ Shift still uncovered\n\nStarts: {} ~\n\nYour shift starts in about 5 hours and nobody has taken it yet.\nPlease contact your workplace right away!",
            self.shift_time(start)
        )
    }
}
