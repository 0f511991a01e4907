//! Per-agent decision timers.
//!
//! [`DecisionScheduler`] decides *when* a humanoid agent may consult the
//! oracle. Three independent clocks feed it:
//!
//! - the base decision timer, re-armed with a jittered interval after every
//!   completed decision;
//! - the decision cooldown, a hard minimum between two oracle invocations;
//! - the reactive cooldown, which throttles damage-driven interrupts. A
//!   reactive interrupt bypasses the decision cooldown entirely.
//!
//! A debounced chat follow-up ([`DebounceTimer`]) bypasses the decision
//! timer but still waits for the cooldown. All times are simulation time.

use std::time::Duration;

use rand::Rng;
use wayfarer_core::AgentConfig;

/// Why a decision is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionTrigger {
    /// The base decision timer expired.
    Timer,
    /// The agent or a nearby character took damage.
    Reactive,
    /// A debounced follow-up after a chat fired.
    ChatFollowUp,
}

impl DecisionTrigger {
    /// Stable label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timer => "timer",
            Self::Reactive => "reactive",
            Self::ChatFollowUp => "chat_follow_up",
        }
    }
}

/// A one-shot timer where scheduling again replaces the pending deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceTimer {
    deadline: Option<Duration>,
}

impl DebounceTimer {
    /// An idle timer.
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm the timer to fire `delay` after `now`, cancelling any pending
    /// deadline.
    pub const fn schedule(&mut self, now: Duration, delay: Duration) {
        self.deadline = Some(now.saturating_add(delay));
    }

    /// Disarm the timer.
    pub const fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether a deadline is armed.
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether the armed deadline has passed, without consuming it.
    pub fn is_due(&self, now: Duration) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Consume the deadline if it has passed. Fires at most once per
    /// schedule.
    pub fn poll(&mut self, now: Duration) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

/// A duration drawn uniformly from `min_ms..=max_ms` milliseconds.
pub fn jittered<R: Rng + ?Sized>(rng: &mut R, min_ms: u64, max_ms: u64) -> Duration {
    let (lo, hi) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    Duration::from_millis(rng.random_range(lo..=hi))
}

/// Decision timers of one humanoid agent.
#[derive(Debug, Clone)]
pub struct DecisionScheduler {
    interval_min_ms: u64,
    interval_max_ms: u64,
    cooldown: Duration,
    reactive_cooldown: Duration,
    follow_up_delay: Duration,
    next_decision_at: Duration,
    last_invocation: Option<Duration>,
    last_reactive: Option<Duration>,
    follow_up: DebounceTimer,
}

impl DecisionScheduler {
    /// Create a scheduler whose first decision is one jittered interval
    /// after `now`.
    pub fn new<R: Rng + ?Sized>(config: &AgentConfig, now: Duration, rng: &mut R) -> Self {
        let mut scheduler = Self {
            interval_min_ms: config.decision_interval_min_ms,
            interval_max_ms: config.decision_interval_max_ms,
            cooldown: config.decision_cooldown(),
            reactive_cooldown: config.reactive_cooldown(),
            follow_up_delay: config.chat_followup_delay(),
            next_decision_at: now,
            last_invocation: None,
            last_reactive: None,
            follow_up: DebounceTimer::new(),
        };
        scheduler.schedule_next(now, rng);
        scheduler
    }

    /// Whether the decision cooldown has elapsed since the last invocation.
    pub fn cooldown_elapsed(&self, now: Duration) -> bool {
        self.last_invocation
            .is_none_or(|last| now.saturating_sub(last) >= self.cooldown)
    }

    fn reactive_ready(&self, now: Duration) -> bool {
        self.last_reactive
            .is_none_or(|last| now.saturating_sub(last) >= self.reactive_cooldown)
    }

    /// Check every timer and, if one fires, record the invocation and return
    /// its trigger. `damaged` reports a reactive condition observed this
    /// tick.
    ///
    /// Priority: reactive interrupt, then chat follow-up, then the base
    /// timer. A follow-up that comes due during the cooldown stays armed
    /// until the cooldown elapses.
    pub fn poll(&mut self, now: Duration, damaged: bool) -> Option<DecisionTrigger> {
        let trigger = if damaged && self.reactive_ready(now) {
            self.last_reactive = Some(now);
            DecisionTrigger::Reactive
        } else if !self.cooldown_elapsed(now) {
            return None;
        } else if self.follow_up.poll(now) {
            DecisionTrigger::ChatFollowUp
        } else if now >= self.next_decision_at {
            DecisionTrigger::Timer
        } else {
            return None;
        };
        self.last_invocation = Some(now);
        Some(trigger)
    }

    /// Re-arm the base timer one jittered interval after `now`. Called once
    /// a decision completes (or fails).
    pub fn schedule_next<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) {
        let interval = jittered(rng, self.interval_min_ms, self.interval_max_ms);
        self.next_decision_at = now.saturating_add(interval);
    }

    /// Schedule the debounced post-chat decision. Replaces a pending one.
    pub const fn schedule_follow_up(&mut self, now: Duration) {
        self.follow_up.schedule(now, self.follow_up_delay);
    }

    /// Whether a chat follow-up is armed.
    pub const fn follow_up_pending(&self) -> bool {
        self.follow_up.is_pending()
    }

    /// Forget all timer state (respawn).
    pub fn reset<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) {
        self.last_invocation = None;
        self.last_reactive = None;
        self.follow_up.cancel();
        self.schedule_next(now, rng);
    }

    /// Disarm the follow-up timer (death).
    pub const fn cancel_follow_up(&mut self) {
        self.follow_up.cancel();
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn scheduler() -> DecisionScheduler {
        let config = AgentConfig {
            decision_interval_min_ms: 1_000,
            decision_interval_max_ms: 1_000,
            ..AgentConfig::default()
        };
        DecisionScheduler::new(&config, Duration::ZERO, &mut StdRng::seed_from_u64(1))
    }

    #[test]
    fn timer_fires_after_interval() {
        let mut s = scheduler();
        assert_eq!(s.poll(Duration::from_millis(999), false), None);
        assert_eq!(s.poll(secs(1), false), Some(DecisionTrigger::Timer));
    }

    #[test]
    fn triggers_within_cooldown_yield_one_invocation() {
        let mut s = scheduler();
        let mut invocations = 0;
        // Timer is due from 1s onward and never re-armed here, so every tick
        // is a trigger; only the cooldown holds them back.
        for ms in (1_000..11_000).step_by(50) {
            if s.poll(Duration::from_millis(ms), false).is_some() {
                invocations += 1;
            }
        }
        assert_eq!(invocations, 1);
        // Cooldown (10s) elapsed: the next trigger goes through.
        assert!(s.poll(secs(11), false).is_some());
    }

    #[test]
    fn reactive_bypasses_cooldown_but_has_its_own() {
        let mut s = scheduler();
        assert_eq!(s.poll(secs(1), false), Some(DecisionTrigger::Timer));
        // Inside the decision cooldown, damage still interrupts.
        assert_eq!(s.poll(secs(2), true), Some(DecisionTrigger::Reactive));
        // Reactive cooldown (7s) throttles the next one.
        assert_eq!(s.poll(secs(5), true), None);
        assert_eq!(s.poll(secs(9), true), Some(DecisionTrigger::Reactive));
    }

    #[test]
    fn follow_up_waits_for_cooldown_and_fires_once() {
        let mut s = scheduler();
        let mut rng = StdRng::seed_from_u64(2);
        assert!(s.poll(secs(1), false).is_some());
        s.schedule_next(secs(1), &mut rng);
        s.schedule_follow_up(secs(2));

        // Due at 5s, but the cooldown runs until 11s.
        assert_eq!(s.poll(secs(6), false), None);
        assert!(s.follow_up_pending());
        assert_eq!(s.poll(secs(11), false), Some(DecisionTrigger::ChatFollowUp));
        assert!(!s.follow_up_pending());
    }

    #[test]
    fn debounce_is_last_write_wins() {
        let mut t = DebounceTimer::new();
        t.schedule(secs(0), secs(3));
        t.schedule(secs(2), secs(3));
        assert!(!t.poll(secs(4)));
        assert!(t.poll(secs(5)));
        assert!(!t.poll(secs(6)));
    }

    #[test]
    fn jitter_stays_in_band() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let d = jittered(&mut rng, 500, 1_000);
            assert!(d >= Duration::from_millis(500) && d <= secs(1));
        }
        // Inverted bounds do not panic.
        let d = jittered(&mut rng, 9, 3);
        assert!(d >= Duration::from_millis(3));
    }
}
