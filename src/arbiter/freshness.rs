//! # Autonomy Freshness Tracking
//!
//! Temporal memory of the arbiter: how long since the autonomy computer last
//! delivered a valid command.
//!
//! Staleness is judged on wall-clock time so the safety timeout does not
//! depend on how fast the control loop spins. The cycle counter is kept for
//! diagnostics.

use std::time::Duration;
use tokio::time::Instant;

use super::mode::AutonomyStatus;

/// Tracks the age of the latest autonomy command.
#[derive(Debug, Clone)]
pub struct FreshnessTracker {
    timeout: Duration,
    cycles_since_update: u64,
    last_update: Option<Instant>,
}

impl FreshnessTracker {
    /// Creates a tracker that has never seen a command.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cycles_since_update: 0,
            last_update: None,
        }
    }

    /// Records one control cycle. Call exactly once per cycle, whatever the
    /// current mode.
    pub fn record_cycle(&mut self, new_command: bool, now: Instant) {
        if new_command {
            self.cycles_since_update = 0;
            self.last_update = Some(now);
        } else {
            self.cycles_since_update = self.cycles_since_update.saturating_add(1);
        }
    }

    /// Fresh while a command has been seen within the timeout.
    /// A tracker that has never seen a command is stale.
    #[must_use]
    pub fn status(&self, now: Instant) -> AutonomyStatus {
        match self.since_update(now) {
            Some(age) if age <= self.timeout => AutonomyStatus::Fresh,
            _ => AutonomyStatus::Stale,
        }
    }

    /// Cycles elapsed since the last command (0 on the cycle it arrived)
    #[must_use]
    pub fn cycles_since_update(&self) -> u64 {
        self.cycles_since_update
    }

    /// Time since the last command, `None` if none was ever received
    #[must_use]
    pub fn since_update(&self, now: Instant) -> Option<Duration> {
        self.last_update
            .map(|last| now.saturating_duration_since(last))
    }

    /// Configured timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
