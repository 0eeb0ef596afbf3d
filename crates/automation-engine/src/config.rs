//! Engine configuration

use std::time::Duration;

/// Lower bound for the execution-dedupe window: anything below one poll
/// interval would let overlapping ticks re-dispatch within a minute.
const MIN_EXECUTION_WINDOW: Duration = Duration::from_secs(60);

/// Upper bound for the execution-dedupe window, so marker keys cannot
/// accumulate indefinitely.
const MAX_EXECUTION_WINDOW: Duration = Duration::from_secs(3600);

/// Tunable timings of the automation engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum time between two firings of the same auto-behavior rule
    pub cooldown: Duration,
    /// Schedule poll interval
    pub poll_interval: Duration,
    /// TTL of execution-dedupe markers
    pub execution_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(30_000),
            poll_interval: Duration::from_secs(60),
            execution_window: Duration::from_secs(90),
        }
    }
}

impl EngineConfig {
    /// Clamp the execution window into its supported range
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.execution_window = self
            .execution_window
            .clamp(MIN_EXECUTION_WINDOW, MAX_EXECUTION_WINDOW);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_window_is_clamped() {
        let config = EngineConfig {
            execution_window: Duration::from_secs(5),
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.execution_window, Duration::from_secs(60));

        let config = EngineConfig {
            execution_window: Duration::from_secs(86_400),
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.execution_window, Duration::from_secs(3600));
    }
}
