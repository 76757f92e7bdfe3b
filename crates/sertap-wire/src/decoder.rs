use thiserror::Error;

use sertap_foundation::{ChannelId, Sample};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame body too short: {len} bytes")]
    TooShort { len: usize },

    #[error("unknown node id: {node_id:#04x}")]
    UnknownNodeId { node_id: u8 },
}

/// Value-extraction strategy for one frame body.
///
/// `body[0]` is the node ID; implementations read the reading from
/// `body[1..]`. Swapping the strategy adapts the decoder to alternate
/// packet layouts without touching the scanner.
pub trait ValueExtract: Send + Sync {
    fn extract(&self, body: &[u8]) -> Result<f64, DecodeError>;
}

/// Default wire layout: `body[1]` is the reading as an unsigned byte,
/// cast directly with no scaling.
pub struct RawByteValue;

impl ValueExtract for RawByteValue {
    fn extract(&self, body: &[u8]) -> Result<f64, DecodeError> {
        match body.get(1) {
            Some(&value) => Ok(f64::from(value)),
            None => Err(DecodeError::TooShort { len: body.len() }),
        }
    }
}

/// Maps validated frame bodies to channel samples.
///
/// Decode failures are per-frame and recoverable; the caller counts them
/// and moves on to the next frame.
pub struct FrameDecoder {
    extract: Box<dyn ValueExtract>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_extractor(Box::new(RawByteValue))
    }

    pub fn with_extractor(extract: Box<dyn ValueExtract>) -> Self {
        Self { extract }
    }

    pub fn decode(&self, body: &[u8], tick: u64) -> Result<Sample, DecodeError> {
        if body.len() < 2 {
            return Err(DecodeError::TooShort { len: body.len() });
        }
        let channel = ChannelId::from_node_id(body[0])
            .ok_or(DecodeError::UnknownNodeId { node_id: body[0] })?;
        let value = self.extract.extract(body)?;
        Ok(Sample {
            channel,
            value,
            tick,
        })
    }
}
