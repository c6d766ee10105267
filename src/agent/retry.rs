//! Retry accounting for the auto-correction loop.
//!
//! Tracks how many planning rounds one user request has consumed and
//! carries the last failure forward as error context for the next
//! round. A fresh context is constructed per request, so the budget
//! never leaks across requests.

/// Per-request retry state. Owned exclusively by the runtime for the
/// duration of one request, discarded after success or exhaustion.
#[derive(Debug)]
pub struct RetryContext {
    /// Completed (failed) planning rounds so far.
    pub attempt: u32,
    max_attempts: u32,
    /// Failure description fed back to the planner on the next round.
    pub last_error: Option<String>,
}

impl RetryContext {
    /// `max_attempts` is the total planning-round budget; it is clamped
    /// to at least 1 so every request gets one round.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            last_error: None,
        }
    }

    /// Records a failed round and stores its error as context for the
    /// next planning call.
    pub fn record_failure(&mut self, error: String) {
        self.attempt += 1;
        self.last_error = Some(error);
    }

    /// True once the whole budget is spent.
    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_of_three_allows_two_retries() {
        let mut ctx = RetryContext::new(3);
        assert!(!ctx.exhausted());

        ctx.record_failure("first".to_string());
        assert!(!ctx.exhausted());

        ctx.record_failure("second".to_string());
        assert!(!ctx.exhausted());

        ctx.record_failure("third".to_string());
        assert!(ctx.exhausted());
    }

    #[test]
    fn test_budget_of_one_means_no_retry() {
        let mut ctx = RetryContext::new(1);
        ctx.record_failure("boom".to_string());
        assert!(ctx.exhausted());
    }

    #[test]
    fn test_zero_budget_is_clamped_to_one() {
        let ctx = RetryContext::new(0);
        assert_eq!(ctx.max_attempts(), 1);
    }

    #[test]
    fn test_last_error_tracks_most_recent_failure() {
        let mut ctx = RetryContext::new(3);
        assert!(ctx.last_error.is_none());

        ctx.record_failure("first".to_string());
        ctx.record_failure("second".to_string());
        assert_eq!(ctx.last_error.as_deref(), Some("second"));
        assert_eq!(ctx.attempt, 2);
    }
}
