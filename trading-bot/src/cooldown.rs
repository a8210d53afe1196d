//! Minimum spacing between submitted orders

use chrono::{DateTime, Utc};
use std::time::Duration;

/// When the last confirmed order went out. Owned by the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownState {
    last_trade_time: Option<DateTime<Utc>>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_trade_time(&self) -> Option<DateTime<Utc>> {
        self.last_trade_time
    }

    /// Call only after the exchange acknowledged the order.
    pub fn record_trade(&mut self, at: DateTime<Utc>) {
        self.last_trade_time = Some(at);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CooldownGuard {
    min_interval: Duration,
}

impl CooldownGuard {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn may_trade(&self, now: DateTime<Utc>, state: &CooldownState) -> bool {
        self.remaining(now, state).is_zero()
    }

    /// Time left before the next order is allowed; zero when trading is open.
    pub fn remaining(&self, now: DateTime<Utc>, state: &CooldownState) -> Duration {
        let Some(last) = state.last_trade_time else {
            return Duration::ZERO;
        };

        // a clock that stepped backwards counts as no time elapsed
        let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
        self.min_interval.saturating_sub(elapsed)
    }
}
