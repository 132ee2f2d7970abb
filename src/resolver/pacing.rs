use std::time::Duration;

use crate::config::ResolverConfig;

/// Delay between search requests that grows with each consecutive miss and
/// snaps back to the base on a hit.
#[derive(Debug, Clone)]
pub struct AdaptivePacer {
    base: Duration,
    step: Duration,
    max: Duration,
    misses: u32,
}

impl AdaptivePacer {
    pub fn new(base: Duration, step: Duration, max: Duration) -> Self {
        Self {
            base,
            step,
            max: max.max(base),
            misses: 0,
        }
    }

    pub fn current(&self) -> Duration {
        self.base
            .saturating_add(self.step.saturating_mul(self.misses))
            .min(self.max)
    }

    pub fn record_hit(&mut self) {
        self.misses = 0;
    }

    pub fn record_miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }
}

impl From<&ResolverConfig> for AdaptivePacer {
    fn from(config: &ResolverConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.delay_step_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}
