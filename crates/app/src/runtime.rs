use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::info;

use sertap_foundation::{AppError, RecordError};
use sertap_store::{ChannelStore, RecordingSession, SavedRecording, DEFAULT_STORE_CAPACITY};
use sertap_telemetry::PipelineMetrics;
use sertap_wire::constants::{
    DEFAULT_BAUD, DEFAULT_READ_TIMEOUT, DEFAULT_RING_CAPACITY, DEFAULT_TICK_HZ,
};
use sertap_wire::{
    ByteRingBuffer, ByteSource, CaptureConfig, CaptureThread, Demux, DemuxConfig, DemoSource,
    SerialSource,
};

/// Options for starting the sertap pipeline.
#[derive(Clone, Debug)]
pub struct AppRuntimeOptions {
    /// Serial device path; ignored when `demo` is set.
    pub port: Option<String>,
    pub baud: u32,
    /// Feed the pipeline from the synthetic generator instead of hardware.
    pub demo: bool,
    pub tick_hz: u32,
    pub store_capacity: usize,
    pub output_dir: PathBuf,
    pub read_timeout: Duration,
}

impl Default for AppRuntimeOptions {
    fn default() -> Self {
        Self {
            port: None,
            baud: DEFAULT_BAUD,
            demo: false,
            tick_hz: DEFAULT_TICK_HZ,
            store_capacity: DEFAULT_STORE_CAPACITY,
            output_dir: PathBuf::from("."),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Handle to the running pipeline.
///
/// Owns the capture thread and the demux task; the store, recorder, and
/// metrics are shared so a presentation layer can poll them while the
/// pipeline runs.
pub struct AppHandle {
    pub store: Arc<ChannelStore>,
    pub recorder: Arc<RecordingSession>,
    pub metrics: Arc<PipelineMetrics>,
    capture: CaptureThread,
    demux_handle: JoinHandle<()>,
    started: Instant,
}

fn open_source(opts: &AppRuntimeOptions) -> Result<Box<dyn ByteSource>, AppError> {
    if opts.demo {
        return Ok(Box::new(DemoSource::new()));
    }
    let port = opts
        .port
        .as_deref()
        .ok_or_else(|| AppError::Config("no serial port selected (or use --demo)".into()))?;
    let source = SerialSource::open(port, opts.baud, opts.read_timeout)?;
    Ok(Box::new(source))
}

/// Wire source -> capture -> ring -> demux -> store/recorder and start
/// everything. Must be called from within a tokio runtime.
pub fn start_runtime(opts: AppRuntimeOptions) -> Result<AppHandle, AppError> {
    let metrics = Arc::new(PipelineMetrics::default());
    let store = Arc::new(ChannelStore::new(opts.store_capacity));
    let recorder = Arc::new(RecordingSession::new(&opts.output_dir));

    let source = open_source(&opts)?;
    let ring = ByteRingBuffer::new(DEFAULT_RING_CAPACITY);
    let (producer, consumer) = ring.split();

    let capture = CaptureThread::spawn(
        source,
        producer,
        metrics.clone(),
        CaptureConfig::default(),
    )?;

    let demux = Demux::new(
        consumer,
        store.clone(),
        recorder.clone(),
        DemuxConfig {
            tick_hz: opts.tick_hz,
            ..Default::default()
        },
    )
    .with_metrics(metrics.clone());
    let demux_handle = demux.spawn();

    info!(
        demo = opts.demo,
        tick_hz = opts.tick_hz,
        "sertap pipeline started"
    );

    Ok(AppHandle {
        store,
        recorder,
        metrics,
        capture,
        demux_handle,
        started: Instant::now(),
    })
}

impl AppHandle {
    pub fn start_recording(&self) -> Result<(), RecordError> {
        self.recorder.start()
    }

    pub fn stop_recording(&self) -> Result<SavedRecording, RecordError> {
        let saved = self.recorder.stop()?;
        self.metrics.increment_recordings_saved();
        Ok(saved)
    }

    /// Drop all buffered samples, e.g. on reconnect or demo toggle.
    pub fn clear(&self) {
        self.store.clear_all();
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop the pipeline: quiesce the source first so no new bytes arrive,
    /// then wind down the demux task. An in-flight recording is stopped and
    /// saved on the way out.
    pub async fn shutdown(self) -> Option<SavedRecording> {
        info!("shutting down sertap runtime");

        self.capture.stop();
        self.demux_handle.abort();
        let _ = self.demux_handle.await;

        let saved = if self.recorder.is_recording() {
            match self.recorder.stop() {
                Ok(saved) => {
                    self.metrics.increment_recordings_saved();
                    info!(rows = saved.rows, path = %saved.path.display(), "recording saved during shutdown");
                    Some(saved)
                }
                Err(RecordError::NoData) => None,
                Err(e) => {
                    tracing::error!(error = %e, "failed to save recording during shutdown");
                    None
                }
            }
        } else {
            None
        };

        info!(uptime = ?self.started.elapsed(), "session closed");
        saved
    }
}
