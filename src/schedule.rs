//! Cooldown decisions and pacing between updates.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Default minimum time between two updates of the same repository.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(8 * 60 * 60);

/// Default pause between one update and the next within a run.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub cooldown: Duration,
    pub delay: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            delay: DEFAULT_DELAY,
        }
    }
}

impl Schedule {
    pub fn new(cooldown: Duration, delay: Duration) -> Self {
        Self { cooldown, delay }
    }

    fn cooldown_secs(&self) -> i64 {
        i64::try_from(self.cooldown.as_secs()).unwrap_or(i64::MAX)
    }

    /// A repository never updated is always due. Otherwise it is due once a full
    /// cooldown has elapsed since `last_updated`.
    pub fn is_due(&self, last_updated: Option<i64>, now: i64) -> bool {
        match last_updated {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.cooldown_secs(),
        }
    }

    /// Seconds left before `last_updated` becomes due again; zero when already due.
    pub fn remaining(&self, last_updated: Option<i64>, now: i64) -> u64 {
        match last_updated {
            None => 0,
            Some(last) => {
                let left = self.cooldown_secs().saturating_sub(now.saturating_sub(last));
                u64::try_from(left).unwrap_or(0)
            }
        }
    }
}

/// Source of wall-clock time and of blocking pauses.
pub trait Clock {
    /// Current Unix time in whole seconds.
    fn now(&self) -> i64;

    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_secs()).unwrap_or(i64::MAX),
            Err(before) => -i64::try_from(before.duration().as_secs()).unwrap_or(i64::MAX),
        }
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration)
    }
}

/// Throttles consecutive updates: every call after the first waits `delay`.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    first: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, first: true }
    }

    pub fn wait(&mut self, clock: &dyn Clock) {
        if self.first {
            self.first = false;
            return;
        }
        if !self.delay.is_zero() {
            debug!("pausing {:?} before next update", self.delay);
            clock.sleep(self.delay);
        }
    }
}
