use std::io::{self, Read};
use std::time::Duration;

use serialport::SerialPort;

use sertap_foundation::SourceError;

use crate::constants::{DEFAULT_BAUD, DEFAULT_READ_TIMEOUT};

/// Minimal pull contract over a byte transport.
///
/// `read` blocks up to the source's configured timeout; `Ok(0)` means the
/// wait elapsed with no data. Port discovery, baud rate, and device
/// labeling are the transport layer's concern, not the pipeline's.
#[cfg_attr(test, mockall::automock)]
pub trait ByteSource: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SourceError>;

    fn close(&mut self);

    fn describe(&self) -> String {
        "<byte source>".to_string()
    }
}

/// Live serial transport.
pub struct SerialSource {
    port: Box<dyn SerialPort>,
    name: String,
    timeout: Duration,
}

impl SerialSource {
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self, SourceError> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(|e| match e.kind {
                serialport::ErrorKind::NoDevice => SourceError::PortNotFound {
                    name: path.to_string(),
                },
                _ => SourceError::Serial(e),
            })?;
        tracing::info!(port = path, baud, "serial port opened");
        Ok(Self {
            port,
            name: path.to_string(),
            timeout,
        })
    }

    pub fn open_default(path: &str) -> Result<Self, SourceError> {
        Self::open(path, DEFAULT_BAUD, DEFAULT_READ_TIMEOUT)
    }

    pub fn read_timeout(&self) -> Duration {
        self.timeout
    }
}

impl ByteSource for SerialSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
        match self.port.read(buf) {
            // EOF on a serial fd means the device went away
            Ok(0) => Err(SourceError::Disconnected),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected
                ) =>
            {
                Err(SourceError::Disconnected)
            }
            Err(e) => Err(SourceError::Io(e)),
        }
    }

    fn close(&mut self) {
        // dropping the port handle closes the fd; nothing else to flush
        tracing::debug!(port = %self.name, "serial port closed");
    }

    fn describe(&self) -> String {
        format!("serial:{}", self.name)
    }
}
