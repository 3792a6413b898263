use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

/// Source of the current time for all scheduling decisions (polls, back-off, nonce expiry).
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Used to drive time-dependent logic in tests.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().expect("failed to lock ManualClock");
        *offset += by;
    }

    /// Moves the clock forward to the given instant. Instants in the past are ignored.
    pub fn advance_to(&self, to: Instant) {
        let now = self.now();
        if to > now {
            self.advance(to - now);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().expect("failed to lock ManualClock")
    }
}

#[test]
fn test_manual_clock() {
    let clock = ManualClock::new();
    let start = clock.now();
    assert_eq!(clock.now(), start);

    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now() - start, Duration::from_secs(5));

    clock.advance_to(start + Duration::from_secs(3));
    assert_eq!(clock.now() - start, Duration::from_secs(5));
    clock.advance_to(start + Duration::from_secs(8));
    assert_eq!(clock.now() - start, Duration::from_secs(8));
}
