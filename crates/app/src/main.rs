use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use sertap_app::config::AppConfig;
use sertap_app::runtime::{start_runtime, AppRuntimeOptions};
use sertap_foundation::{AppState, StateManager};
use sertap_wire::scan_ports;

#[derive(Parser, Debug)]
#[command(name = "sertap", about = "Six-channel serial acquisition and recording core")]
struct Cli {
    /// Serial device path (e.g. /dev/ttyUSB0, COM3)
    #[arg(short, long, env = "SERTAP_PORT")]
    port: Option<String>,

    /// Baud rate (default from config, 921600 out of the box)
    #[arg(long)]
    baud: Option<u32>,

    /// Feed the pipeline from the synthetic 3-channel generator
    #[arg(long)]
    demo: bool,

    /// List serial ports (likely Arduino adapters first) and exit
    #[arg(long)]
    list_ports: bool,

    /// Start a recording session immediately
    #[arg(long)]
    record: bool,

    /// Directory for recording CSV files
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Demux tick rate in Hz
    #[arg(long)]
    tick_hz: Option<u32>,

    /// TOML config file providing defaults for the flags above
    #[arg(long, env = "SERTAP_CONFIG")]
    config: Option<PathBuf>,
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "sertap.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(_guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().map_err(|e| anyhow::anyhow!("logging init failed: {}", e))?;
    let cli = Cli::parse();

    if cli.list_ports {
        let ports = scan_ports().context("scanning serial ports")?;
        if ports.is_empty() {
            println!("No ports found");
            return Ok(());
        }
        for port in ports {
            let tag = if port.arduino { " [Arduino]" } else { "" };
            println!("{} -- {}{}", port.device, port.description, tag);
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => AppConfig::load(path).context("loading config file")?,
        None => AppConfig::default(),
    };

    let opts = AppRuntimeOptions {
        port: cli.port.clone(),
        baud: cli.baud.unwrap_or(config.baud),
        demo: cli.demo,
        tick_hz: cli.tick_hz.unwrap_or(config.tick_hz),
        store_capacity: config.store_capacity,
        output_dir: cli.out_dir.clone().unwrap_or(config.output_dir.clone()),
        read_timeout: Duration::from_millis(config.read_timeout_ms),
    };

    let state = StateManager::new();
    let handle = start_runtime(opts).context("starting pipeline")?;
    state.transition(AppState::Running)?;

    if cli.record {
        handle.start_recording()?;
        info!("recording from startup");
    }

    // periodic status line, the headless stand-in for the UI's gauges
    let status_metrics = handle.metrics.clone();
    let status = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        interval.tick().await; // skip the immediate first tick
        loop {
            interval.tick().await;
            let snap = status_metrics.snapshot();
            info!(
                bytes = snap.bytes_read,
                frames = snap.frames_scanned,
                samples = snap.samples_demuxed,
                desyncs = snap.desyncs,
                decode_errors = snap.decode_errors,
                rows = snap.rows_buffered,
                "pipeline status"
            );
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("received ctrl-c, shutting down");

    state.transition(AppState::Stopping)?;
    status.abort();

    if let Some(saved) = handle.shutdown().await {
        info!(path = %saved.path.display(), rows = saved.rows, "recording saved on exit");
    }

    state.transition(AppState::Stopped)?;
    Ok(())
}
