pub mod capture;
pub mod constants;
pub mod decoder;
pub mod demo;
pub mod demux;
pub mod ports;
pub mod ring_buffer;
pub mod scanner;
pub mod source;
pub mod watchdog;

// Public API
pub use capture::{CaptureConfig, CaptureThread};
pub use decoder::{DecodeError, FrameDecoder, RawByteValue, ValueExtract};
pub use demo::DemoSource;
pub use demux::{Demux, DemuxConfig};
pub use ports::{scan_ports, PortInfo};
pub use ring_buffer::{ByteConsumer, ByteProducer, ByteRingBuffer};
pub use scanner::{FrameScanner, ScanEvent};
pub use source::{ByteSource, SerialSource};
pub use watchdog::WatchdogTimer;
