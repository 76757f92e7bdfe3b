//! Clock abstractions so time-dependent code (demo pacing, recording
//! timestamps) can run against virtual time in tests.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Monotonic clock used for pacing and stall detection.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

pub struct RealClock;

impl Default for RealClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RealClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock: `sleep` advances the clock instead of blocking.
pub struct TestClock {
    current_time: Mutex<Instant>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            current_time: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.current_time.lock() += duration;
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.current_time.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        std::thread::yield_now();
    }
}

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub fn real_clock() -> SharedClock {
    Arc::new(RealClock::new())
}

pub fn test_clock() -> SharedClock {
    Arc::new(TestClock::new())
}

/// Wall-clock seconds since the Unix epoch, used for recording rows and
/// file names.
pub trait WallClock: Send + Sync {
    fn unix_secs(&self) -> f64;
}

pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn unix_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Deterministic wall clock: starts at `base` and advances by `step` on
/// every read, so recorded timestamps are strictly increasing and
/// reproducible.
pub struct SteppedWallClock {
    next: Mutex<f64>,
    step: f64,
}

impl SteppedWallClock {
    pub fn new(base: f64, step: f64) -> Self {
        Self {
            next: Mutex::new(base),
            step,
        }
    }
}

impl WallClock for SteppedWallClock {
    fn unix_secs(&self) -> f64 {
        let mut next = self.next.lock();
        let now = *next;
        *next += self.step;
        now
    }
}

pub type SharedWallClock = Arc<dyn WallClock + Send + Sync>;

pub fn system_wall_clock() -> SharedWallClock {
    Arc::new(SystemWallClock)
}
