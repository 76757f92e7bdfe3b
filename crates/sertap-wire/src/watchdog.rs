use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Flags a stalled byte source: if `feed` is not called within the timeout,
/// the watchdog logs once and latches `is_triggered` until the next feed.
#[derive(Clone)]
pub struct WatchdogTimer {
    timeout: Duration,
    last_feed: Arc<Mutex<Option<Instant>>>,
    triggered: Arc<AtomicBool>,
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl WatchdogTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_feed: Arc::new(Mutex::new(None)),
            triggered: Arc::new(AtomicBool::new(false)),
            handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn start(&mut self, running: Arc<AtomicBool>) {
        let timeout = self.timeout;
        let last_feed = Arc::clone(&self.last_feed);
        let triggered = Arc::clone(&self.triggered);

        *last_feed.lock() = Some(Instant::now());

        let handle = thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(POLL_INTERVAL);

                let stalled_for = (*last_feed.lock())
                    .map(|last| last.elapsed())
                    .filter(|elapsed| *elapsed > timeout);

                if let Some(elapsed) = stalled_for {
                    if !triggered.swap(true, Ordering::SeqCst) {
                        tracing::warn!(
                            "no serial data for {:?}, source appears stalled",
                            elapsed
                        );
                    }
                }
            }
        });

        *self.handle.lock() = Some(handle);
    }

    pub fn feed(&self) {
        *self.last_feed.lock() = Some(Instant::now());
        self.triggered.store(false, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Join the poll thread. The caller clears the shared running flag
    /// first; the join is bounded by the poll interval.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
        self.triggered.store(false, Ordering::SeqCst);
        *self.last_feed.lock() = None;
    }
}
