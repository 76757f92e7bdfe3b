//! End-to-end pipeline tests against the synthetic source: demo bytes flow
//! through capture, the ring, and the demux into the store and a recording.

use std::time::{Duration, Instant};

use sertap_app::runtime::{start_runtime, AppRuntimeOptions};
use sertap_foundation::{ChannelId, RecordError};

fn demo_options(output_dir: &std::path::Path) -> AppRuntimeOptions {
    AppRuntimeOptions {
        demo: true,
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}

fn ch(id: u8) -> ChannelId {
    ChannelId::new(id).unwrap()
}

async fn wait_for<F: Fn() -> bool>(predicate: F, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    predicate()
}

#[tokio::test]
async fn demo_samples_reach_the_store_on_three_channels() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start_runtime(demo_options(dir.path())).unwrap();

    let store = handle.store.clone();
    let populated = wait_for(
        || (1..=3).all(|id| !store.is_empty(ch(id))),
        Duration::from_secs(5),
    )
    .await;
    assert!(populated, "demo channels never produced samples");

    // the demo transmits on channels 1..3 only
    for id in 4..=6 {
        assert!(handle.store.is_empty(ch(id)));
    }

    // snapshots are ordered and within the wire's byte range
    let snap = handle.store.snapshot(ch(1), 500);
    assert!(!snap.is_empty());
    for pair in snap.windows(2) {
        assert!(pair[0].tick <= pair[1].tick);
    }
    assert!(snap.iter().all(|s| (0.0..=255.0).contains(&s.value)));

    handle.shutdown().await;
}

#[tokio::test]
async fn recording_a_demo_run_produces_a_rectangular_csv() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start_runtime(demo_options(dir.path())).unwrap();

    handle.start_recording().unwrap();
    assert!(matches!(
        handle.start_recording(),
        Err(RecordError::AlreadyRecording)
    ));

    let recorder = handle.recorder.clone();
    assert!(wait_for(|| recorder.row_count() >= 10, Duration::from_secs(5)).await);

    let saved = handle.stop_recording().unwrap();
    assert!(saved.rows >= 10);
    assert!(saved.path.starts_with(dir.path()));

    let text = std::fs::read_to_string(&saved.path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), "timestamp,CH1,CH2,CH3,CH4,CH5,CH6");
    for line in lines {
        assert_eq!(line.split(',').count(), 7);
        // CH4..CH6 never speak in demo mode
        let cells: Vec<&str> = line.split(',').collect();
        assert_eq!(cells[4], "NaN");
        assert_eq!(cells[6], "NaN");
    }
    assert_eq!(text.lines().count(), saved.rows + 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_saves_an_active_recording() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start_runtime(demo_options(dir.path())).unwrap();

    handle.start_recording().unwrap();
    let recorder = handle.recorder.clone();
    assert!(wait_for(|| recorder.row_count() >= 3, Duration::from_secs(5)).await);

    let saved = handle.shutdown().await.expect("recording saved on shutdown");
    assert!(saved.rows >= 3);
    assert!(saved.path.exists());
}

#[tokio::test]
async fn runtime_without_port_or_demo_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let opts = AppRuntimeOptions {
        demo: false,
        port: None,
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    assert!(matches!(
        start_runtime(opts),
        Err(sertap_foundation::AppError::Config(_))
    ));
}

#[tokio::test]
async fn clear_empties_every_channel_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start_runtime(demo_options(dir.path())).unwrap();

    let store = handle.store.clone();
    assert!(wait_for(|| !store.is_empty(ch(1)), Duration::from_secs(5)).await);

    handle.clear();
    // new samples may land immediately after the clear; only assert the
    // window shrank to recent data
    let snap = handle.store.snapshot(ch(1), 500);
    assert!(snap.len() < 5);

    handle.shutdown().await;
}
