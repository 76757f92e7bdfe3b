use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sertap_foundation::SourceError;
use sertap_telemetry::{PipelineMetrics, PipelineStage};

use crate::ring_buffer::ByteProducer;
use crate::source::ByteSource;
use crate::watchdog::WatchdogTimer;

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Upper bound for a single source read.
    pub read_chunk: usize,
    /// How long the source may stay silent before the watchdog logs a stall.
    pub stall_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            read_chunk: 1024,
            stall_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle to the dedicated wire-capture thread.
///
/// The thread performs bounded blocking reads from the byte source and
/// pushes chunks into the SPSC ring; a full ring sheds the chunk rather
/// than blocking the read loop. The thread halts on disconnect or when
/// `stop` flips the shared running flag, bounded by the source's read
/// timeout.
pub struct CaptureThread {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

impl CaptureThread {
    pub fn spawn(
        mut source: Box<dyn ByteSource>,
        mut producer: ByteProducer,
        metrics: Arc<PipelineMetrics>,
        config: CaptureConfig,
    ) -> Result<Self, SourceError> {
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = running.clone();

        let handle = thread::Builder::new()
            .name("wire-capture".to_string())
            .spawn(move || {
                let label = source.describe();
                let mut watchdog = WatchdogTimer::new(config.stall_timeout);
                watchdog.start(running.clone());
                let mut buf = vec![0u8; config.read_chunk.max(1)];
                tracing::info!(source = %label, "wire capture started");

                while running.load(Ordering::SeqCst) {
                    match source.read(&mut buf) {
                        Ok(0) => {
                            // bounded wait elapsed with no data
                            metrics.increment_read_timeouts();
                        }
                        Ok(n) => {
                            watchdog.feed();
                            metrics.add_bytes_read(n as u64);
                            metrics.mark_stage_active(PipelineStage::Capture);
                            if let Err(dropped) = producer.write(&buf[..n]) {
                                metrics.add_bytes_shed(dropped as u64);
                            }
                        }
                        Err(SourceError::Disconnected) | Err(SourceError::Closed) => {
                            tracing::warn!(source = %label, "byte source disconnected");
                            break;
                        }
                        Err(e) => {
                            metrics.increment_capture_errors();
                            tracing::error!(source = %label, error = %e, "source read failed");
                            break;
                        }
                    }
                }

                running.store(false, Ordering::SeqCst);
                watchdog.stop();
                source.close();
                tracing::info!(source = %label, "wire capture stopped");
            })
            .map_err(SourceError::Io)?;

        Ok(Self { handle, shutdown })
    }

    /// Request shutdown and join. Bounded by the source's read timeout plus
    /// the watchdog poll interval.
    pub fn stop(self) {
        self.shutdown.store(false, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}
