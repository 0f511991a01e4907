//! World clock and simulation time.
//!
//! The clock is the single source of truth for temporal state in the engine.
//! Every cooldown, debounce and perception interval is keyed off
//! [`WorldClock::now`], which is the sum of the frame deltas fed to
//! [`WorldClock::advance`]. The runner feeds measured real time; tests feed
//! whatever they like, which makes every timer deterministic.
//!
//! # Design Principles
//!
//! - The tick counter uses checked arithmetic (no silent overflow).
//! - Simulation time only moves forward.

use std::time::Duration;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Simulation time would overflow.
    #[error("simulation time overflow")]
    TimeOverflow,
}

/// Tick counter plus accumulated simulation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldClock {
    /// Number of completed ticks.
    tick: u64,
    /// Simulation time elapsed since the world started.
    now: Duration,
}

impl WorldClock {
    /// Create a clock at tick 0, time 0.
    pub const fn new() -> Self {
        Self {
            tick: 0,
            now: Duration::ZERO,
        }
    }

    /// Create a clock from explicit parts (state restoration, tests).
    pub const fn from_parts(tick: u64, now: Duration) -> Self {
        Self { tick, now }
    }

    /// Advance by one tick of length `dt`. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] or [`ClockError::TimeOverflow`]
    /// if either counter would overflow.
    pub fn advance(&mut self, dt: Duration) -> Result<u64, ClockError> {
        let tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        let now = self.now.checked_add(dt).ok_or(ClockError::TimeOverflow)?;
        self.tick = tick;
        self.now = now;
        Ok(tick)
    }

    /// Current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current simulation time.
    pub const fn now(&self) -> Duration {
        self.now
    }
}
