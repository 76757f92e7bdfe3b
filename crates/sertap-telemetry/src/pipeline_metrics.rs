use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// One slot per wire channel.
const CHANNEL_SLOTS: usize = 6;

/// Pipeline stages, in data-flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Capture,
    Demux,
    Record,
}

/// Shared metrics for cross-thread pipeline monitoring.
///
/// Every counter is an `Arc`-shared atomic so the capture thread, the demux
/// task, and any status reporter can touch them without locks.
#[derive(Clone)]
pub struct PipelineMetrics {
    // Capture side
    pub bytes_read: Arc<AtomicU64>,
    pub read_timeouts: Arc<AtomicU64>,
    pub bytes_shed: Arc<AtomicU64>, // dropped on ring overflow
    pub capture_errors: Arc<AtomicU64>,

    // Framing / decoding
    pub frames_scanned: Arc<AtomicU64>,
    pub desyncs: Arc<AtomicU64>,
    pub decode_errors: Arc<AtomicU64>,

    // Demux output
    pub samples_demuxed: Arc<AtomicU64>,
    pub channel_samples: Arc<[AtomicU64; CHANNEL_SLOTS]>,
    pub ticks: Arc<AtomicU64>,
    pub last_sample_time: Arc<RwLock<Option<Instant>>>,

    // Recording
    pub rows_buffered: Arc<AtomicUsize>, // gauge, current session
    pub recordings_saved: Arc<AtomicU64>,

    // Rates (per-second * 10 for one decimal of precision)
    pub frame_fps: Arc<AtomicU64>,
    pub demux_fps: Arc<AtomicU64>,

    // Stage activity flags
    pub stage_capture: Arc<AtomicBool>,
    pub stage_demux: Arc<AtomicBool>,
    pub stage_record: Arc<AtomicBool>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            bytes_read: Arc::new(AtomicU64::new(0)),
            read_timeouts: Arc::new(AtomicU64::new(0)),
            bytes_shed: Arc::new(AtomicU64::new(0)),
            capture_errors: Arc::new(AtomicU64::new(0)),

            frames_scanned: Arc::new(AtomicU64::new(0)),
            desyncs: Arc::new(AtomicU64::new(0)),
            decode_errors: Arc::new(AtomicU64::new(0)),

            samples_demuxed: Arc::new(AtomicU64::new(0)),
            channel_samples: Arc::new(Default::default()),
            ticks: Arc::new(AtomicU64::new(0)),
            last_sample_time: Arc::new(RwLock::new(None)),

            rows_buffered: Arc::new(AtomicUsize::new(0)),
            recordings_saved: Arc::new(AtomicU64::new(0)),

            frame_fps: Arc::new(AtomicU64::new(0)),
            demux_fps: Arc::new(AtomicU64::new(0)),

            stage_capture: Arc::new(AtomicBool::new(false)),
            stage_demux: Arc::new(AtomicBool::new(false)),
            stage_record: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl PipelineMetrics {
    pub fn add_bytes_read(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_read_timeouts(&self) {
        self.read_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_shed(&self, n: u64) {
        self.bytes_shed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_capture_errors(&self) {
        self.capture_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames(&self) {
        self.frames_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_desyncs(&self) {
        self.desyncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_decode_errors(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one demuxed sample on the given zero-based channel slot.
    pub fn record_sample(&self, channel_index: usize) {
        self.samples_demuxed.fetch_add(1, Ordering::Relaxed);
        if let Some(slot) = self.channel_samples.get(channel_index) {
            slot.fetch_add(1, Ordering::Relaxed);
        }
        *self.last_sample_time.write() = Some(Instant::now());
    }

    pub fn increment_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_rows_buffered(&self, rows: usize) {
        self.rows_buffered.store(rows, Ordering::Relaxed);
    }

    pub fn increment_recordings_saved(&self) {
        self.recordings_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_frame_fps(&self, fps: f64) {
        self.frame_fps
            .store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn update_demux_fps(&self, fps: f64) {
        self.demux_fps
            .store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn mark_stage_active(&self, stage: PipelineStage) {
        let flag = match stage {
            PipelineStage::Capture => &self.stage_capture,
            PipelineStage::Demux => &self.stage_demux,
            PipelineStage::Record => &self.stage_record,
        };
        flag.store(true, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters, for status logging.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut channel_samples = [0u64; CHANNEL_SLOTS];
        for (out, slot) in channel_samples.iter_mut().zip(self.channel_samples.iter()) {
            *out = slot.load(Ordering::Relaxed);
        }
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_shed: self.bytes_shed.load(Ordering::Relaxed),
            frames_scanned: self.frames_scanned.load(Ordering::Relaxed),
            desyncs: self.desyncs.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            samples_demuxed: self.samples_demuxed.load(Ordering::Relaxed),
            channel_samples,
            ticks: self.ticks.load(Ordering::Relaxed),
            rows_buffered: self.rows_buffered.load(Ordering::Relaxed),
            recordings_saved: self.recordings_saved.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub bytes_shed: u64,
    pub frames_scanned: u64,
    pub desyncs: u64,
    pub decode_errors: u64,
    pub samples_demuxed: u64,
    pub channel_samples: [u64; CHANNEL_SLOTS],
    pub ticks: u64,
    pub rows_buffered: usize,
    pub recordings_saved: u64,
}
