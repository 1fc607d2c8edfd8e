use std::time::Duration;

// Use tokio::time::Instant for tests (allows time manipulation)
// Use std::time::Instant for production (more efficient)
#[cfg(not(test))]
type InstantProvider = std::time::Instant;

#[cfg(test)]
type InstantProvider = tokio::time::Instant;

/// Configuration for the bounded retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Hard ceiling on total tries, the first included.
    pub max_attempts: usize,
    /// Fixed delay between consecutive tries.
    pub backoff: Duration,
    /// Interval for logging warnings during retries.
    pub log_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,                       // attempt ceiling per fetch task
            backoff: Duration::from_millis(100),    // fixed wait between tries
            log_interval: Duration::from_secs(10),  // log at most every 10 seconds
        }
    }
}

/// State tracker for one task's retry attempts.
pub struct RetryState {
    config: RetryConfig,
    start_time: InstantProvider,
    last_log_time: Option<InstantProvider>,
    attempt: usize,
}

impl std::fmt::Debug for RetryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryState").field("config", &self.config).field("attempt", &self.attempt).finish()
    }
}

impl RetryState {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, start_time: InstantProvider::now(), last_log_time: None, attempt: 0 }
    }

    /// Record one failed try and return the updated attempt count.
    pub fn record_attempt(&mut self) -> usize {
        self.attempt += 1;
        self.attempt
    }

    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// True once the attempt ceiling has been reached; the task must then
    /// settle with a terminal outcome instead of retrying.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.config.max_attempts
    }

    /// Delay before the next try.
    pub fn next_delay(&self) -> Duration {
        self.config.backoff
    }

    /// Check if we should log this retry attempt (throttled logging)
    pub fn should_log(&mut self) -> bool {
        match self.last_log_time {
            None => {
                self.last_log_time = Some(InstantProvider::now());
                true
            }
            Some(last) => {
                if last.elapsed() >= self.config.log_interval {
                    self.last_log_time = Some(InstantProvider::now());
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Elapsed time since the first try.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
