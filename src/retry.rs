//! Bounded retry counters
//!
//! [`RetryBudget`] bounds polling loops inside a run (cold-launch
//! pre-validation, reboot confirmation). [`RetryPolicy`] bounds how many
//! times a failed KPI run is repeated as a whole.

use serde::{Deserialize, Serialize};

/// Attempt counter for a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub current_attempt: u32,
    pub poll_interval_secs: u64,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, poll_interval_secs: u64) -> Self {
        Self {
            max_attempts,
            current_attempt: 0,
            poll_interval_secs,
        }
    }

    /// Consume one attempt; `false` once the budget is spent
    pub fn next_attempt(&mut self) -> bool {
        if self.current_attempt >= self.max_attempts {
            return false;
        }
        self.current_attempt += 1;
        true
    }

}

/// Test-level retry: a failed run is repeated while `retry_count < max_retry_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub retry_count: u32,
    pub max_retry_count: u32,
}

impl RetryPolicy {
    pub fn new(retry_count: u32, max_retry_count: u32) -> Self {
        Self {
            retry_count,
            max_retry_count,
        }
    }

    pub fn should_retry(&self) -> bool {
        self.retry_count < self.max_retry_count
    }

    /// Count one retry; returns whether it was allowed
    pub fn record_retry(&mut self) -> bool {
        if !self.should_retry() {
            return false;
        }
        self.retry_count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_allows_exactly_max_attempts() {
        let mut budget = RetryBudget::new(3, 10);
        let mut attempts = 0;
        while budget.next_attempt() {
            attempts += 1;
        }
        assert_eq!(attempts, 3);
        assert_eq!(budget.current_attempt, 3);
        assert!(!budget.next_attempt());
    }

    #[test]
    fn test_zero_budget_never_runs() {
        let mut budget = RetryBudget::new(0, 10);
        assert!(!budget.next_attempt());
    }

    #[test]
    fn test_policy_retries_until_max() {
        let mut policy = RetryPolicy::new(0, 2);
        assert!(policy.record_retry());
        assert!(policy.record_retry());
        assert!(!policy.record_retry());
        assert_eq!(policy.retry_count, 2);
    }

    #[test]
    fn test_policy_without_retries() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry());
    }
}
