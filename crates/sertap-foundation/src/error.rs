use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::channel::ChannelId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Wire subsystem error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Transient error, will retry: {0}")]
    Transient(String),
}

/// Failures of the byte transport feeding the pipeline.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Port not found: {name}")]
    PortNotFound { name: String },

    #[error("Source disconnected")]
    Disconnected,

    #[error("Source closed")]
    Closed,

    #[error("No data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Misuse of the channel store's append contract.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("out-of-order append on {channel}: tick {tick} precedes tick {last}")]
    OutOfOrderTick {
        channel: ChannelId,
        tick: u64,
        last: u64,
    },
}

/// Recording session state-machine and serialization failures.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("recording already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("recording buffer is empty, nothing to save")]
    NoData,

    #[error("failed to write recording: {0}")]
    WriteFailure(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Restart,
    Ignore,
    Fatal,
}

impl AppError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            AppError::Source(SourceError::Disconnected) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            AppError::Source(SourceError::NoDataTimeout { .. }) => RecoveryStrategy::Ignore,
            AppError::Source(SourceError::PortNotFound { .. }) => RecoveryStrategy::Fatal,
            AppError::Fatal(_) | AppError::ShutdownRequested => RecoveryStrategy::Fatal,
            AppError::Transient(_) => RecoveryStrategy::Retry {
                max_attempts: 3,
                delay: Duration::from_millis(500),
            },
            _ => RecoveryStrategy::Restart,
        }
    }
}
