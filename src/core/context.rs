//! Execution context of one invocation
//!
//! The platform owns the context; the dispatcher only reads the remaining
//! time budget and the log location used in diagnostics and as the
//! fallback physical resource id.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

pub const LOG_GROUP_ENV: &str = "AWS_LAMBDA_LOG_GROUP_NAME";
pub const LOG_STREAM_ENV: &str = "AWS_LAMBDA_LOG_STREAM_NAME";

/// Read-only view of the compute platform for one invocation
pub trait ExecutionContext: Send + Sync {
    /// Time left before the platform kills the invocation
    fn remaining_time(&self) -> Duration;

    /// Log stream of this invocation, also the fallback physical resource id
    fn log_stream_name(&self) -> &str;

    fn log_group_name(&self) -> &str;
}

/// Context backed by a fixed deadline
#[derive(Debug, Clone)]
pub struct LambdaContext {
    deadline: Instant,
    log_group_name: String,
    log_stream_name: String,
}

impl LambdaContext {
    pub fn new(
        deadline: Instant,
        log_group_name: impl Into<String>,
        log_stream_name: impl Into<String>,
    ) -> Self {
        Self {
            deadline,
            log_group_name: log_group_name.into(),
            log_stream_name: log_stream_name.into(),
        }
    }

    /// Context whose deadline is `remaining` from now
    pub fn with_remaining(
        remaining: Duration,
        log_group_name: impl Into<String>,
        log_stream_name: impl Into<String>,
    ) -> Self {
        Self::new(Instant::now() + remaining, log_group_name, log_stream_name)
    }

    /// Context for a deadline expressed in epoch milliseconds, the way the
    /// runtime API reports it
    pub fn from_epoch_deadline_ms(
        deadline_ms: u64,
        log_group_name: impl Into<String>,
        log_stream_name: impl Into<String>,
    ) -> Self {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let remaining = Duration::from_millis(deadline_ms.saturating_sub(now_ms));
        Self::with_remaining(remaining, log_group_name, log_stream_name)
    }

    /// Context with the log location taken from the platform environment
    pub fn from_env(remaining: Duration) -> Self {
        let log_group_name = std::env::var(LOG_GROUP_ENV).unwrap_or_default();
        let log_stream_name = std::env::var(LOG_STREAM_ENV).unwrap_or_default();
        Self::with_remaining(remaining, log_group_name, log_stream_name)
    }
}

impl ExecutionContext for LambdaContext {
    fn remaining_time(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn log_stream_name(&self) -> &str {
        &self.log_stream_name
    }

    fn log_group_name(&self) -> &str {
        &self.log_group_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_remaining_time_counts_down() {
        let ctx = LambdaContext::with_remaining(Duration::from_secs(3), "group", "stream");
        assert_eq!(ctx.remaining_time(), Duration::from_secs(3));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(ctx.remaining_time(), Duration::from_secs(2));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(ctx.remaining_time(), Duration::ZERO);
    }

    #[test]
    fn test_past_epoch_deadline_has_no_budget() {
        let ctx = LambdaContext::from_epoch_deadline_ms(0, "group", "stream");
        assert_eq!(ctx.remaining_time(), Duration::ZERO);
        assert_eq!(ctx.log_stream_name(), "stream");
        assert_eq!(ctx.log_group_name(), "group");
    }
}
