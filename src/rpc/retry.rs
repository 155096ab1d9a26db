//! Retry budget threaded through the proxy path

use std::time::Duration;

/// Delay between proxy attempts after an undecodable response
pub const PROXY_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Remaining proxy attempts and the delay before each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempts_remaining: u32,
    delay: Duration,
}

impl RetryState {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts_remaining: attempts,
            delay,
        }
    }

    /// No retries; the first failure is surfaced
    pub const fn none(delay: Duration) -> Self {
        Self::new(0, delay)
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Spend one attempt, returning how long to wait before it
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts_remaining == 0 {
            return None;
        }
        self.attempts_remaining -= 1;
        Some(self.delay)
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::none(PROXY_RETRY_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_is_spent() {
        let mut state = RetryState::new(1, PROXY_RETRY_DELAY);
        assert_eq!(state.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(state.attempts_remaining(), 0);
        assert_eq!(state.next_delay(), None);

        let mut none = RetryState::default();
        assert_eq!(none.next_delay(), None);
    }
}
