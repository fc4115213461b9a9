use std::time::Duration;

/// Exponential reconnect delay: doubles per failure, capped, reset on success
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial_secs: u64,
    max_secs: u64,
    next_secs: u64,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(1, 32)
    }
}

impl ReconnectBackoff {
    pub fn new(initial_secs: u64, max_secs: u64) -> Self {
        let initial_secs = initial_secs.max(1);
        let max_secs = max_secs.max(initial_secs);
        Self { initial_secs, max_secs, next_secs: initial_secs }
    }

    /// Delay before the next attempt; advances the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next_secs;
        self.next_secs = (self.next_secs * 2).min(self.max_secs);
        Duration::from_secs(delay)
    }

    pub fn reset(&mut self) {
        self.next_secs = self.initial_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_cap_and_resets() {
        let mut backoff = ReconnectBackoff::default();
        let delays: Vec<u64> = (0..8).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 32, 32]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }
}
