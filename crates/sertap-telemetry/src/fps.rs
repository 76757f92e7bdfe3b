use std::time::{Duration, Instant};

/// Counts events and reports a rate once per second.
///
/// `tick()` returns `Some(rate)` when at least a second has elapsed since
/// the last report, then starts a new window.
pub struct FpsTracker {
    window_start: Instant,
    count: u32,
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.count += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            let fps = self.count as f64 / elapsed.as_secs_f64();
            self.window_start = Instant::now();
            self.count = 0;
            Some(fps)
        } else {
            None
        }
    }
}
