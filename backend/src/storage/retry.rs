//! Exponential backoff for lock/busy failures

use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()).max(0.0))
    }

    /// How long to wait before retrying, or `None` when `err` must surface
    pub fn next_delay(&self, attempt: u32, err: &AppError) -> Option<Duration> {
        if attempt >= self.max_attempts || !err.is_transient() {
            return None;
        }
        Some(self.delay_for(attempt))
    }

    /// Error to surface once no retry is left
    pub fn give_up(&self, operation: &'static str, attempts: u32, err: AppError) -> AppError {
        if err.is_transient() {
            tracing::error!(
                operation,
                attempts,
                error = %err,
                "Storage still locked, giving up"
            );
            AppError::StorageBusy {
                operation,
                attempts,
            }
        } else {
            err
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy() -> AppError {
        AppError::StorageBusy {
            operation: "test",
            attempts: 1,
        }
    }

    #[test]
    fn delays_double_up_to_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(8));
    }

    #[test]
    fn only_transient_errors_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.next_delay(1, &busy()).is_some());
        assert!(policy.next_delay(3, &busy()).is_none());
        assert!(policy
            .next_delay(1, &AppError::NotFound("Order".into()))
            .is_none());
    }

    #[test]
    fn permanent_errors_surface_unchanged() {
        let policy = RetryPolicy::default();
        let err = policy.give_up("op", 1, AppError::NotFound("Order".into()));
        assert!(matches!(err, AppError::NotFound(_)));
        let err = policy.give_up("op", 3, busy());
        assert!(matches!(err, AppError::StorageBusy { attempts: 3, .. }));
    }
}
