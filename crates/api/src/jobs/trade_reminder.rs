//! Background job reminding requesters of trades nobody has claimed.

use chrono::Utc;

use domain::services::reminder::SWEEP_INTERVAL_MINUTES;
use domain::services::ReminderSweeper;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::{record_reminder_sweep, record_reminder_sweep_error};

/// Runs one [`ReminderSweeper`] sweep per tick. Reminders are awaited inside
/// the tick; a store failure fails this tick only.
pub struct TradeReminderJob {
    sweeper: ReminderSweeper,
}

impl TradeReminderJob {
    pub fn new(sweeper: ReminderSweeper) -> Self {
        Self { sweeper }
    }
}

#[async_trait::async_trait]
impl Job for TradeReminderJob {
    fn name(&self) -> &'static str {
        "trade_reminder"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(SWEEP_INTERVAL_MINUTES as u64)
    }

    async fn execute(&self) -> Result<(), String> {
        match self.sweeper.sweep_at(Utc::now()).await {
            Ok(report) => {
                record_reminder_sweep(&report);
                if report.candidates > 0 {
                    tracing::info!(
                        candidates = report.candidates,
                        reminded = report.reminded,
                        skipped = report.skipped,
                        failed = report.failed,
                        "Reminder sweep finished"
                    );
                }
                Ok(())
            }
            Err(e) => {
                record_reminder_sweep_error();
                Err(format!("Reminder sweep skipped: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::models::NewTrade;
    use domain::services::{MessageFormatter, MockPushGateway, Notifier};
    use domain::store::{FailPoint, MemoryTradeStore, TradeStore};
    use std::sync::Arc;

    const REQUESTER: &str = "U0123456789abcdef0123456789abcdef";

    fn job(store: Arc<MemoryTradeStore>, gateway: Arc<MockPushGateway>) -> TradeReminderJob {
        TradeReminderJob::new(ReminderSweeper::new(
            store,
            Notifier::new(gateway),
            MessageFormatter::default(),
        ))
    }

    #[test]
    fn test_runs_every_ten_minutes() {
        let job = job(
            Arc::new(MemoryTradeStore::new()),
            Arc::new(MockPushGateway::new()),
        );
        assert_eq!(job.frequency(), JobFrequency::Minutes(10));
        assert_eq!(job.name(), "trade_reminder");
    }

    #[tokio::test]
    async fn test_execute_reminds_requester() {
        let store = Arc::new(MemoryTradeStore::new());
        let gateway = Arc::new(MockPushGateway::new());
        let requester = store.create_user(REQUESTER, "Aoi", None).await.unwrap();
        let (group, _) = store.create_group("Cafe", "AB12CD", requester.id).await.unwrap();
        let start = Utc::now() + Duration::minutes(304);
        store
            .create_trade(&NewTrade {
                group_id: group.id,
                requester_id: requester.id,
                shift_start_at: start,
                shift_end_at: start + Duration::hours(3),
                bounty_description: String::new(),
            })
            .await
            .unwrap();

        job(store, gateway.clone()).execute().await.unwrap();
        assert_eq!(gateway.sent_to(REQUESTER).len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_fails_tick() {
        let store = Arc::new(MemoryTradeStore::new());
        store.inject_failure(FailPoint::Unavailable);
        let result = job(store, Arc::new(MockPushGateway::new())).execute().await;
        assert!(result.unwrap_err().contains("Reminder sweep skipped"));
    }
}
