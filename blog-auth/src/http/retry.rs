//! Exponential backoff retry policy.

use std::time::{Duration, SystemTime};

use reqwest_retry::{RetryDecision, RetryPolicy};

/// Exponential backoff retry policy.
///
/// Retries with doubling delays capped at `max_delay`, and gives up once the next
/// attempt would start after the total budget measured from the first request.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    total_budget: Option<Duration>,
}

impl BackoffPolicy {
    /// Create a new retry policy with a 1 second base delay and 60 second cap.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            total_budget: None,
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_total_budget(mut self, budget: Duration) -> Self {
        self.total_budget = Some(budget);
        self
    }

    /// Calculate exponential backoff delay.
    fn exponential_delay(&self, n_attempts: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * 2_f64.powi(n_attempts as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    fn decide(&self, request_start_time: SystemTime, now: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            return RetryDecision::DoNotRetry;
        }
        let execute_after = now + self.exponential_delay(n_past_retries);
        if let Some(budget) = self.total_budget {
            if execute_after > request_start_time + budget {
                return RetryDecision::DoNotRetry;
            }
        }
        RetryDecision::Retry { execute_after }
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        self.decide(request_start_time, SystemTime::now(), n_past_retries)
    }
}
