use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Monotonic time source for the session core
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock for deterministic runs
///
/// Clones share the same time, so a test can keep one handle and move the
/// clock while the context owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            origin,
            now: Arc::new(Mutex::new(origin)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Jump to `offset` past the clock's origin. Never moves backwards.
    pub fn set_elapsed(&self, offset: Duration) {
        let target = self.origin + offset;
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if target > *now {
            *now = target;
        }
    }

    /// Time elapsed since the clock was created
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.now().duration_since(self.origin)
    }

    /// The instant the clock was created at
    #[must_use]
    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_all_clones() {
        let clock = ManualClock::new();
        let shared = clock.clone();

        clock.advance(Duration::from_secs(90));
        assert_eq!(shared.elapsed(), Duration::from_secs(90));
    }

    #[test]
    fn test_set_elapsed_never_goes_backwards() {
        let clock = ManualClock::new();
        clock.set_elapsed(Duration::from_secs(10));
        clock.set_elapsed(Duration::from_secs(5));
        assert_eq!(clock.elapsed(), Duration::from_secs(10));
    }
}
