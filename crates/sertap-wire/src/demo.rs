use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sertap_foundation::clock::{real_clock, SharedClock};
use sertap_foundation::SourceError;

use crate::constants::FRAME_TERMINATOR;
use crate::source::ByteSource;

/// Fixed seed: demo runs are reproducible by construction.
const DEMO_SEED: u64 = 0x5EED;

/// The demo transmits on nodes 0x31..0x33 (channels 1..3).
const DEMO_CHANNELS: usize = 3;

const PHASE_STEP: f64 = 0.08;

/// Synthetic values stay within roughly ±2.5; this span maps them onto the
/// wire's unsigned byte range without clipping.
const VALUE_SPAN: f64 = 5.12;

const DEFAULT_TICK: Duration = Duration::from_millis(16);

/// Synthetic signal generator behind the same byte contract as live
/// hardware: it emits real protocol frames, so the scanner and decoder see
/// demo data and serial data identically.
///
/// One frame group (one frame per synthetic channel) is produced per tick,
/// paced through the injected clock. Restarting (or `reset`) reproduces the
/// identical byte sequence.
pub struct DemoSource {
    phase: f64,
    counters: [u8; DEMO_CHANNELS],
    rng: StdRng,
    pending: VecDeque<u8>,
    tick: Duration,
    clock: SharedClock,
    closed: bool,
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoSource {
    pub fn new() -> Self {
        Self::with_clock(real_clock(), DEFAULT_TICK)
    }

    pub fn with_clock(clock: SharedClock, tick: Duration) -> Self {
        Self {
            phase: 0.0,
            counters: [0; DEMO_CHANNELS],
            rng: StdRng::seed_from_u64(DEMO_SEED),
            pending: VecDeque::new(),
            tick,
            clock,
            closed: false,
        }
    }

    /// Restart the sequence from phase zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.counters = [0; DEMO_CHANNELS];
        self.rng = StdRng::seed_from_u64(DEMO_SEED);
        self.pending.clear();
        self.closed = false;
    }

    fn noise(&mut self, scale: f64) -> f64 {
        (self.rng.gen::<f64>() * 2.0 - 1.0) * scale
    }

    /// One value per synthetic channel for the current phase.
    fn synth(&mut self) -> [f64; DEMO_CHANNELS] {
        let x = self.phase;
        self.phase += PHASE_STEP;
        let n1 = self.noise(0.1);
        let n2 = self.noise(0.3);
        let n3 = self.noise(0.1);
        [
            x.sin() + (2.0 * x).sin() + n1,
            (0.5 * x).sin() + n2,
            0.7 * x.cos() + 0.4 * (3.0 * x).sin() + n3,
        ]
    }

    fn quantize(value: f64) -> u8 {
        (((value / VALUE_SPAN) + 0.5) * 255.0).round().clamp(0.0, 255.0) as u8
    }

    fn push_frame_group(&mut self) {
        let values = self.synth();
        for (slot, value) in values.into_iter().enumerate() {
            self.pending.push_back(0x31 + slot as u8);
            self.pending.push_back(Self::quantize(value));
            self.pending.push_back(self.counters[slot]);
            self.counters[slot] = self.counters[slot].wrapping_add(1);
            self.pending.extend(FRAME_TERMINATOR);
        }
    }
}

impl ByteSource for DemoSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            // pace like a live device: one frame group per tick
            self.clock.sleep(self.tick);
            self.push_frame_group();
        }
        let n = buf.len().min(self.pending.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.pending.pop_front().unwrap();
        }
        Ok(n)
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn describe(&self) -> String {
        "demo".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::FrameDecoder;
    use crate::scanner::{FrameScanner, ScanEvent};
    use sertap_foundation::clock::test_clock;

    fn drain(source: &mut DemoSource, total: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(total);
        let mut buf = [0u8; 97]; // odd size to exercise partial reads
        while out.len() < total {
            let n = source.read(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n.min(total - out.len())]);
        }
        out
    }

    #[test]
    fn two_fresh_sources_produce_identical_streams() {
        let mut a = DemoSource::with_clock(test_clock(), DEFAULT_TICK);
        let mut b = DemoSource::with_clock(test_clock(), DEFAULT_TICK);
        assert_eq!(drain(&mut a, 4096), drain(&mut b, 4096));
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut source = DemoSource::with_clock(test_clock(), DEFAULT_TICK);
        let first = drain(&mut source, 1024);
        source.reset();
        let second = drain(&mut source, 1024);
        assert_eq!(first, second);
    }

    #[test]
    fn output_is_valid_frames_on_channels_one_to_three() {
        let mut source = DemoSource::with_clock(test_clock(), DEFAULT_TICK);
        let bytes = drain(&mut source, 9 * 40); // 40 frame groups

        let mut scanner = FrameScanner::new();
        let decoder = FrameDecoder::new();
        let mut decoded = Vec::new();
        for event in scanner.push_chunk(&bytes) {
            match event {
                ScanEvent::Frame(body) => decoded.push(decoder.decode(&body, 0).unwrap()),
                ScanEvent::Desync { .. } => panic!("demo stream must never desync"),
            }
        }

        assert_eq!(decoded.len(), 3 * 40);
        for (i, sample) in decoded.iter().enumerate() {
            assert_eq!(sample.channel.get() as usize, (i % 3) + 1);
            assert!((0.0..=255.0).contains(&sample.value));
        }
    }

    #[test]
    fn counter_byte_increments_per_channel() {
        let mut source = DemoSource::with_clock(test_clock(), DEFAULT_TICK);
        let bytes = drain(&mut source, 9 * 4);
        let mut scanner = FrameScanner::new();
        let counters: Vec<u8> = scanner
            .push_chunk(&bytes)
            .into_iter()
            .filter_map(|e| match e {
                ScanEvent::Frame(body) if body[0] == 0x31 => Some(body[2]),
                _ => None,
            })
            .collect();
        assert_eq!(counters, vec![0, 1, 2, 3]);
    }

    #[test]
    fn close_ends_the_stream() {
        let mut source = DemoSource::with_clock(test_clock(), DEFAULT_TICK);
        source.close();
        let mut buf = [0u8; 16];
        assert!(matches!(source.read(&mut buf), Err(SourceError::Closed)));
    }

    #[test]
    fn quantize_clamps_to_byte_range() {
        assert_eq!(DemoSource::quantize(0.0), 128);
        assert_eq!(DemoSource::quantize(-10.0), 0);
        assert_eq!(DemoSource::quantize(10.0), 255);
    }
}
