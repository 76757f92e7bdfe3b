use std::collections::VecDeque;

use parking_lot::RwLock;

use sertap_foundation::{ChannelId, Sample, StoreError, NUM_CHANNELS};

/// Default per-channel retention, sized for the live display window with
/// plenty of scroll-back.
pub const DEFAULT_STORE_CAPACITY: usize = 5_000;

#[derive(Debug, Default)]
struct ChannelRing {
    samples: VecDeque<(u64, f64)>,
}

/// Bounded per-channel sample windows shared between the demux task and the
/// presentation poller.
///
/// Appends take a write lock on one channel only; snapshots take a read
/// lock and never mutate, so a redraw cycle can read all six channels while
/// the producer keeps appending.
pub struct ChannelStore {
    channels: [RwLock<ChannelRing>; NUM_CHANNELS],
    capacity: usize,
}

impl ChannelStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: std::array::from_fn(|_| RwLock::new(ChannelRing::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one sample. Ticks must be non-decreasing per channel;
    /// out-of-order appends are a logic error and are rejected, never
    /// silently reordered. Oldest samples are evicted FIFO once the channel
    /// is at capacity.
    pub fn append(&self, channel: ChannelId, value: f64, tick: u64) -> Result<(), StoreError> {
        let mut ring = self.channels[channel.index()].write();
        if let Some(&(last, _)) = ring.samples.back() {
            if tick < last {
                return Err(StoreError::OutOfOrderTick {
                    channel,
                    tick,
                    last,
                });
            }
        }
        if ring.samples.len() == self.capacity {
            ring.samples.pop_front();
        }
        ring.samples.push_back((tick, value));
        Ok(())
    }

    /// The most recent `window` samples for a channel, oldest-first (fewer
    /// if the channel has not accumulated that many yet).
    pub fn snapshot(&self, channel: ChannelId, window: usize) -> Vec<Sample> {
        let ring = self.channels[channel.index()].read();
        let start = ring.samples.len().saturating_sub(window);
        ring.samples
            .iter()
            .skip(start)
            .map(|&(tick, value)| Sample {
                channel,
                value,
                tick,
            })
            .collect()
    }

    pub fn latest(&self, channel: ChannelId) -> Option<Sample> {
        let ring = self.channels[channel.index()].read();
        ring.samples.back().map(|&(tick, value)| Sample {
            channel,
            value,
            tick,
        })
    }

    pub fn len(&self, channel: ChannelId) -> usize {
        self.channels[channel.index()].read().samples.len()
    }

    pub fn is_empty(&self, channel: ChannelId) -> bool {
        self.len(channel) == 0
    }

    /// Reset one channel, used on reconnect or demo toggle.
    pub fn clear_channel(&self, channel: ChannelId) {
        self.channels[channel.index()].write().samples.clear();
    }

    pub fn clear_all(&self) {
        for ring in &self.channels {
            ring.write().samples.clear();
        }
    }
}
