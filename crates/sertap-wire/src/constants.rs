use std::time::Duration;

/// Frame terminator on the wire.
pub const FRAME_TERMINATOR: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Maximum frame length including the terminator.
pub const MAX_FRAME_LEN: usize = 244;

/// Maximum frame body length (terminator stripped).
pub const MAX_BODY_LEN: usize = MAX_FRAME_LEN - FRAME_TERMINATOR.len();

/// Default serial baud rate, matching the firmware's UART configuration.
pub const DEFAULT_BAUD: u32 = 921_600;

/// Bounded wait for a single serial read. Keeps cancellation latency low
/// without busy-looping.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Default demux tick rate.
pub const DEFAULT_TICK_HZ: u32 = 60;

/// Capture ring capacity in bytes. Roughly ten seconds of headroom at the
/// expected peak sample rate.
pub const DEFAULT_RING_CAPACITY: usize = 64 * 1024;
