//! Database metrics collection.

use metrics::{counter, histogram};
use std::time::Instant;

/// Record database query duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Count a failed store operation by error class.
pub fn record_store_error(operation: &'static str, kind: &'static str) {
    counter!(
        "store_errors_total",
        "operation" => operation,
        "kind" => kind
    )
    .increment(1);
}

/// Times one query and records it under `query_name`.
///
/// ```ignore
/// let timer = QueryTimer::new("find_trade_by_id");
/// let result = sqlx::query_as::<_, TradeEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_keeps_name() {
        let timer = QueryTimer::new("claim_trade");
        assert_eq!(timer.query_name, "claim_trade");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        QueryTimer::new("claim_trade").record();
        record_store_error("claim_trade", "backend");
    }
}
