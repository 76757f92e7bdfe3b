use rtrb::{Consumer, Producer, RingBuffer};
use tracing::warn;

/// SPSC byte ring between the capture thread and the demux task, built on
/// rtrb so the capture side never blocks on a lock.
pub struct ByteRingBuffer {
    producer: Producer<u8>,
    consumer: Consumer<u8>,
}

impl ByteRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    /// Split into producer and consumer halves for separate threads.
    pub fn split(self) -> (ByteProducer, ByteConsumer) {
        (
            ByteProducer {
                producer: self.producer,
            },
            ByteConsumer {
                consumer: self.consumer,
            },
        )
    }
}

/// Producer half, owned by the capture thread.
pub struct ByteProducer {
    producer: Producer<u8>,
}

impl ByteProducer {
    /// Write a chunk, all-or-nothing. A full ring sheds the whole chunk so
    /// the reader is never blocked; the caller counts what was dropped.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, usize> {
        let mut chunk = match self.producer.write_chunk(bytes.len()) {
            Ok(chunk) => chunk,
            Err(_) => {
                warn!(
                    "capture ring overflow: shedding {} bytes, demux is behind",
                    bytes.len()
                );
                return Err(bytes.len());
            }
        };

        // The chunk may wrap; fill both slices
        let (first, second) = chunk.as_mut_slices();
        let split = first.len();
        if split > 0 {
            first.copy_from_slice(&bytes[..split]);
        }
        if !second.is_empty() {
            second.copy_from_slice(&bytes[split..]);
        }
        chunk.commit_all();
        Ok(bytes.len())
    }

    /// Free space in bytes.
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

/// Consumer half, owned by the demux task.
pub struct ByteConsumer {
    consumer: Consumer<u8>,
}

impl ByteConsumer {
    /// Read whatever is available, up to `buffer.len()` bytes. Non-blocking.
    pub fn read(&mut self, buffer: &mut [u8]) -> usize {
        let chunk = match self.consumer.read_chunk(buffer.len()) {
            Ok(chunk) => chunk,
            Err(rtrb::chunks::ChunkError::TooFewSlots(available)) => {
                if available == 0 {
                    return 0;
                }
                self.consumer.read_chunk(available).unwrap()
            }
        };

        let len = chunk.len();
        let (first, second) = chunk.as_slices();
        let split = first.len();
        if split > 0 {
            buffer[..split].copy_from_slice(first);
        }
        if !second.is_empty() {
            buffer[split..split + second.len()].copy_from_slice(second);
        }
        chunk.commit_all();
        len
    }

    /// Bytes waiting to be read.
    pub fn slots(&self) -> usize {
        self.consumer.slots()
    }
}
