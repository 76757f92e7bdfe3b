use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use sertap_foundation::clock::{system_wall_clock, SharedWallClock};
use sertap_foundation::{RecordError, NUM_CHANNELS};

const HEADER: [&str; 1 + NUM_CHANNELS] =
    ["timestamp", "CH1", "CH2", "CH3", "CH4", "CH5", "CH6"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Recording,
}

#[derive(Debug, Clone, Copy)]
struct Row {
    timestamp: f64,
    values: [f64; NUM_CHANNELS],
}

struct Inner {
    state: SessionState,
    rows: Vec<Row>,
    last: [Option<f64>; NUM_CHANNELS],
    started_unix: f64,
    output_dir: PathBuf,
}

/// Result of a successfully saved recording.
#[derive(Debug, Clone)]
pub struct SavedRecording {
    pub path: PathBuf,
    pub rows: usize,
}

/// Optional, independently-lifecycled recording of every demux tick.
///
/// State machine: Idle -> Recording -> Idle, re-entrant. While recording,
/// `on_tick` appends one rectangular row per tick: a fresh value if the
/// channel produced one this tick, else the last recorded value
/// (carry-forward), else NaN for a channel that has not spoken yet this
/// session. On stop the rows are serialized to
/// `recording_<unix_timestamp>.csv` via a temp file and an atomic rename.
///
/// A write failure keeps the session in Recording with the buffer intact;
/// the caller may point `set_output_dir` somewhere else and call `stop`
/// again.
pub struct RecordingSession {
    inner: Mutex<Inner>,
    clock: SharedWallClock,
}

impl RecordingSession {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(output_dir, system_wall_clock())
    }

    pub fn with_clock(output_dir: impl Into<PathBuf>, clock: SharedWallClock) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                rows: Vec::new(),
                last: [None; NUM_CHANNELS],
                started_unix: 0.0,
                output_dir: output_dir.into(),
            }),
            clock,
        }
    }

    pub fn start(&self) -> Result<(), RecordError> {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Recording {
            return Err(RecordError::AlreadyRecording);
        }
        inner.rows = Vec::new();
        inner.last = [None; NUM_CHANNELS];
        inner.started_unix = self.clock.unix_secs();
        inner.state = SessionState::Recording;
        tracing::info!("recording started");
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.inner.lock().state == SessionState::Recording
    }

    /// Current buffer size, for the "Buffer: N rows" gauge.
    pub fn row_count(&self) -> usize {
        self.inner.lock().rows.len()
    }

    pub fn set_output_dir(&self, dir: impl Into<PathBuf>) {
        self.inner.lock().output_dir = dir.into();
    }

    /// Record one tick. `fresh` holds the latest value each channel
    /// produced during this tick, `None` for quiet channels.
    pub fn on_tick(&self, fresh: &[Option<f64>; NUM_CHANNELS]) -> Result<(), RecordError> {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Recording {
            return Err(RecordError::NotRecording);
        }
        let timestamp = self.clock.unix_secs();
        let mut values = [f64::NAN; NUM_CHANNELS];
        for slot in 0..NUM_CHANNELS {
            if let Some(v) = fresh[slot] {
                inner.last[slot] = Some(v);
            }
            if let Some(v) = inner.last[slot] {
                values[slot] = v;
            }
        }
        inner.rows.push(Row { timestamp, values });
        Ok(())
    }

    /// Stop and serialize. The buffer is released only after the file is
    /// durably in place.
    pub fn stop(&self) -> Result<SavedRecording, RecordError> {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Recording {
            return Err(RecordError::NotRecording);
        }
        if inner.rows.is_empty() {
            inner.state = SessionState::Idle;
            inner.last = [None; NUM_CHANNELS];
            tracing::info!("recording stopped with no rows, nothing saved");
            return Err(RecordError::NoData);
        }

        let stop_unix = self.clock.unix_secs();
        let path = inner
            .output_dir
            .join(format!("recording_{}.csv", stop_unix as u64));
        let bytes = serialize_rows(&inner.rows)?;
        persist(&inner.output_dir, &path, &bytes)?;

        let rows = inner.rows.len();
        let duration = stop_unix - inner.started_unix;
        inner.rows = Vec::new();
        inner.last = [None; NUM_CHANNELS];
        inner.state = SessionState::Idle;
        tracing::info!(rows, duration_s = duration, path = %path.display(), "recording saved");
        Ok(SavedRecording { path, rows })
    }
}

fn csv_err(err: csv::Error) -> RecordError {
    RecordError::WriteFailure(io::Error::new(io::ErrorKind::Other, err))
}

fn serialize_rows(rows: &[Row]) -> Result<Vec<u8>, RecordError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER).map_err(csv_err)?;
    for row in rows {
        let mut record = Vec::with_capacity(1 + NUM_CHANNELS);
        record.push(format!("{:.3}", row.timestamp));
        for value in row.values {
            // NaN formats as the sentinel literal
            record.push(format!("{}", value));
        }
        writer.write_record(&record).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| RecordError::WriteFailure(io::Error::new(io::ErrorKind::Other, e.to_string())))
}

/// Write through a temp file in the target directory, then rename into
/// place, so a crash or full disk never leaves a half-written recording.
fn persist(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), RecordError> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path)
        .map_err(|e| RecordError::WriteFailure(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sertap_foundation::clock::SteppedWallClock;
    use std::sync::Arc;

    fn session_in(dir: &Path) -> RecordingSession {
        RecordingSession::with_clock(
            dir,
            Arc::new(SteppedWallClock::new(1_700_000_000.0, 0.016)),
        )
    }

    fn fresh(values: [Option<f64>; NUM_CHANNELS]) -> [Option<f64>; NUM_CHANNELS] {
        values
    }

    #[test]
    fn ten_ticks_yield_eleven_lines() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        session.start().unwrap();

        for tick in 0..10u64 {
            let mut values = [None; NUM_CHANNELS];
            // CH1 speaks on every tick, CH2 every third, CH3 never
            values[0] = Some(tick as f64);
            if tick % 3 == 0 {
                values[1] = Some(100.0 + tick as f64);
            }
            session.on_tick(&fresh(values)).unwrap();
        }

        let saved = session.stop().unwrap();
        assert_eq!(saved.rows, 10);
        let text = std::fs::read_to_string(&saved.path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "timestamp,CH1,CH2,CH3,CH4,CH5,CH6");
    }

    #[test]
    fn carry_forward_and_nan_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        session.start().unwrap();

        // tick 0: only CH1
        let mut v = [None; NUM_CHANNELS];
        v[0] = Some(1.5);
        session.on_tick(&v).unwrap();
        // tick 1: only CH2
        let mut v = [None; NUM_CHANNELS];
        v[1] = Some(7.0);
        session.on_tick(&v).unwrap();
        // tick 2: nothing at all
        session.on_tick(&[None; NUM_CHANNELS]).unwrap();

        let saved = session.stop().unwrap();
        let text = std::fs::read_to_string(&saved.path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        let row = |i: usize| -> Vec<&str> { lines[i].split(',').collect() };

        // CH2 shows the sentinel before its first sample
        assert_eq!(row(1)[2], "NaN");
        // CH1 carries 1.5 forward through ticks 1 and 2
        assert_eq!(row(2)[1], "1.5");
        assert_eq!(row(3)[1], "1.5");
        assert_eq!(row(3)[2], "7");
        // CH3..CH6 never spoke
        assert_eq!(row(3)[3], "NaN");
        assert_eq!(row(3)[6], "NaN");
    }

    #[test]
    fn timestamps_have_subsecond_precision_and_increase() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        session.start().unwrap();
        let mut v = [None; NUM_CHANNELS];
        v[0] = Some(1.0);
        session.on_tick(&v).unwrap();
        session.on_tick(&v).unwrap();
        let saved = session.stop().unwrap();

        let text = std::fs::read_to_string(&saved.path).unwrap();
        let ts: Vec<f64> = text
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap().parse().unwrap())
            .collect();
        assert!(ts[1] > ts[0]);
        assert!(text.lines().nth(1).unwrap().split(',').next().unwrap().contains('.'));
    }

    #[test]
    fn double_start_fails_and_keeps_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        session.start().unwrap();
        let mut v = [None; NUM_CHANNELS];
        v[0] = Some(4.0);
        session.on_tick(&v).unwrap();

        assert!(matches!(session.start(), Err(RecordError::AlreadyRecording)));
        assert_eq!(session.row_count(), 1);
        assert!(session.is_recording());
    }

    #[test]
    fn stop_when_idle_fails() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        assert!(matches!(session.stop(), Err(RecordError::NotRecording)));
        assert!(matches!(
            session.on_tick(&[None; NUM_CHANNELS]),
            Err(RecordError::NotRecording)
        ));
    }

    #[test]
    fn stop_with_no_rows_reports_no_data_and_goes_idle() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        session.start().unwrap();
        assert!(matches!(session.stop(), Err(RecordError::NoData)));
        assert!(!session.is_recording());
        // re-entrant: a new session starts cleanly
        session.start().unwrap();
        assert!(session.is_recording());
    }

    #[test]
    fn write_failure_retains_buffer_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        // a plain file where the output directory should be
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"x").unwrap();

        let session = session_in(&blocked);
        session.start().unwrap();
        let mut v = [None; NUM_CHANNELS];
        v[0] = Some(9.0);
        session.on_tick(&v).unwrap();

        assert!(matches!(session.stop(), Err(RecordError::WriteFailure(_))));
        assert!(session.is_recording());
        assert_eq!(session.row_count(), 1);

        // retry into a writable directory succeeds with the same rows
        session.set_output_dir(dir.path());
        let saved = session.stop().unwrap();
        assert_eq!(saved.rows, 1);
        assert!(saved.path.exists());
    }

    #[test]
    fn filename_derives_from_stop_time() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());
        session.start().unwrap();
        let mut v = [None; NUM_CHANNELS];
        v[0] = Some(1.0);
        session.on_tick(&v).unwrap();
        let saved = session.stop().unwrap();
        let name = saved.path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("recording_17"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn sessions_are_independent_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path());

        session.start().unwrap();
        let mut v = [None; NUM_CHANNELS];
        v[0] = Some(1.0);
        session.on_tick(&v).unwrap();
        session.stop().unwrap();

        // the second session must not inherit carry-forward state
        session.start().unwrap();
        session.on_tick(&[None; NUM_CHANNELS]).unwrap();
        let saved = session.stop().unwrap();
        let text = std::fs::read_to_string(&saved.path).unwrap();
        let second_row: Vec<&str> = text.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(second_row[1], "NaN");
    }
}
