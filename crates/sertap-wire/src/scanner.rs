use crate::constants::{FRAME_TERMINATOR, MAX_FRAME_LEN};

/// Outcome of advancing the scanner by one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A complete frame body, terminator stripped (0..=241 bytes).
    Frame(Vec<u8>),
    /// No terminator within the maximum frame length; the accumulator was
    /// discarded and scanning resumes with the next byte.
    Desync { discarded: usize },
}

/// Recovers terminator-delimited frames from an unreliable byte stream.
///
/// A rolling accumulator is capped at the maximum frame size: when the last
/// three bytes equal the terminator, everything before it is emitted as a
/// frame body; when the cap is hit first, the accumulator is dropped and a
/// desync is signalled. The scanner never waits on bytes it has not been
/// given, so it can be driven from any drain loop and restarted at will.
///
/// Framing only: bodies too short to decode are still emitted here and
/// rejected by the decoder.
pub struct FrameScanner {
    acc: Vec<u8>,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScanner {
    pub fn new() -> Self {
        Self {
            acc: Vec::with_capacity(MAX_FRAME_LEN),
        }
    }

    /// Drop any partial frame, e.g. on reconnect.
    pub fn reset(&mut self) {
        self.acc.clear();
    }

    /// Bytes currently accumulated toward the next frame.
    pub fn pending(&self) -> usize {
        self.acc.len()
    }

    pub fn push(&mut self, byte: u8) -> Option<ScanEvent> {
        self.acc.push(byte);

        let len = self.acc.len();
        if len >= FRAME_TERMINATOR.len() && self.acc[len - FRAME_TERMINATOR.len()..] == FRAME_TERMINATOR
        {
            let body = self.acc[..len - FRAME_TERMINATOR.len()].to_vec();
            self.acc.clear();
            return Some(ScanEvent::Frame(body));
        }

        if len >= MAX_FRAME_LEN {
            let discarded = len;
            self.acc.clear();
            return Some(ScanEvent::Desync { discarded });
        }

        None
    }

    /// Convenience for feeding a whole chunk, collecting every event.
    pub fn push_chunk(&mut self, bytes: &[u8]) -> Vec<ScanEvent> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }
}
