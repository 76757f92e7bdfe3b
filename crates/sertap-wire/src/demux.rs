use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

use sertap_foundation::NUM_CHANNELS;
use sertap_store::{ChannelStore, RecordingSession};
use sertap_telemetry::{FpsTracker, PipelineMetrics, PipelineStage};

use crate::constants::DEFAULT_TICK_HZ;
use crate::decoder::FrameDecoder;
use crate::ring_buffer::ByteConsumer;
use crate::scanner::{FrameScanner, ScanEvent};

#[derive(Debug, Clone)]
pub struct DemuxConfig {
    /// Scheduler tick rate; also the recording row cadence.
    pub tick_hz: u32,
    /// Ring drain chunk size per read.
    pub read_chunk: usize,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            read_chunk: 4096,
        }
    }
}

/// Fixed-rate demultiplexer between the capture ring and the consumers.
///
/// Each tick it drains the ring through the scanner and decoder, appends
/// decoded samples to the [`ChannelStore`] stamped with the current tick,
/// and hands the per-tick channel values to the [`RecordingSession`] when
/// one is active. The tick counter advances once per scheduler tick, never
/// per byte, which decouples I/O arrival from the recording cadence.
pub struct Demux {
    consumer: ByteConsumer,
    decoder: FrameDecoder,
    store: Arc<ChannelStore>,
    recorder: Arc<RecordingSession>,
    cfg: DemuxConfig,
    metrics: Option<Arc<PipelineMetrics>>,
    running: Arc<AtomicBool>,
}

impl Demux {
    pub fn new(
        consumer: ByteConsumer,
        store: Arc<ChannelStore>,
        recorder: Arc<RecordingSession>,
        cfg: DemuxConfig,
    ) -> Self {
        Self {
            consumer,
            decoder: FrameDecoder::new(),
            store,
            recorder,
            cfg,
            metrics: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Substitute the value-extraction strategy without touching the
    /// scanner.
    pub fn with_decoder(mut self, decoder: FrameDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let mut worker = DemuxWorker::new(
            self.consumer,
            self.decoder,
            self.store,
            self.recorder,
            self.cfg,
            self.metrics,
        );
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        tokio::spawn(async move {
            worker.run(running).await;
        })
    }
}

struct DemuxWorker {
    consumer: ByteConsumer,
    scanner: FrameScanner,
    decoder: FrameDecoder,
    store: Arc<ChannelStore>,
    recorder: Arc<RecordingSession>,
    cfg: DemuxConfig,
    metrics: Option<Arc<PipelineMetrics>>,
    chunk: Vec<u8>,
    tick: u64,
    pending: [Option<f64>; NUM_CHANNELS],
    frame_fps: FpsTracker,
    tick_fps: FpsTracker,
}

impl DemuxWorker {
    fn new(
        consumer: ByteConsumer,
        decoder: FrameDecoder,
        store: Arc<ChannelStore>,
        recorder: Arc<RecordingSession>,
        cfg: DemuxConfig,
        metrics: Option<Arc<PipelineMetrics>>,
    ) -> Self {
        let chunk = vec![0u8; cfg.read_chunk.max(64)];
        Self {
            consumer,
            scanner: FrameScanner::new(),
            decoder,
            store,
            recorder,
            cfg,
            metrics,
            chunk,
            tick: 0,
            pending: [None; NUM_CHANNELS],
            frame_fps: FpsTracker::new(),
            tick_fps: FpsTracker::new(),
        }
    }

    async fn run(&mut self, running: Arc<AtomicBool>) {
        tracing::info!(tick_hz = self.cfg.tick_hz, "demux started");

        let period = Duration::from_micros(1_000_000 / u64::from(self.cfg.tick_hz.max(1)));
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while running.load(Ordering::SeqCst) {
            interval.tick().await;
            self.drain();
            self.finish_tick();
        }

        tracing::info!(ticks = self.tick, "demux stopped");
    }

    /// Pull everything the capture thread has queued since the last tick.
    fn drain(&mut self) {
        loop {
            let n = self.consumer.read(&mut self.chunk);
            if n == 0 {
                break;
            }
            for i in 0..n {
                let byte = self.chunk[i];
                if let Some(event) = self.scanner.push(byte) {
                    self.on_event(event);
                }
            }
        }
    }

    fn on_event(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Frame(body) => {
                if let Some(m) = &self.metrics {
                    m.increment_frames();
                    if let Some(fps) = self.frame_fps.tick() {
                        m.update_frame_fps(fps);
                    }
                }
                match self.decoder.decode(&body, self.tick) {
                    Ok(sample) => {
                        match self.store.append(sample.channel, sample.value, sample.tick) {
                            Ok(()) => {
                                self.pending[sample.channel.index()] = Some(sample.value);
                                if let Some(m) = &self.metrics {
                                    m.record_sample(sample.channel.index());
                                    m.mark_stage_active(PipelineStage::Demux);
                                }
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "sample rejected by store");
                            }
                        }
                    }
                    Err(e) => {
                        if let Some(m) = &self.metrics {
                            m.increment_decode_errors();
                        }
                        tracing::debug!(error = %e, body_len = body.len(), "frame dropped");
                    }
                }
            }
            ScanEvent::Desync { discarded } => {
                if let Some(m) = &self.metrics {
                    m.increment_desyncs();
                }
                tracing::warn!(
                    discarded,
                    "desync: no terminator within max frame length, resynchronizing"
                );
            }
        }
    }

    fn finish_tick(&mut self) {
        if self.recorder.is_recording() {
            if let Err(e) = self.recorder.on_tick(&self.pending) {
                // the session stopped between the check and the call
                tracing::debug!(error = %e, "tick not recorded");
            }
            if let Some(m) = &self.metrics {
                m.set_rows_buffered(self.recorder.row_count());
                m.mark_stage_active(PipelineStage::Record);
            }
        }
        if let Some(m) = &self.metrics {
            m.increment_ticks();
            if let Some(fps) = self.tick_fps.tick() {
                m.update_demux_fps(fps);
            }
        }
        self.pending = [None; NUM_CHANNELS];
        self.tick += 1;
    }
}
