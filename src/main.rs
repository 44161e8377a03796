//! Camera Session CLI
//!
//! Drives a capture session against simulated cameras: starts it, takes a
//! photo on each side, and optionally keeps capturing until interrupted.

use camera_session::{
    capture::{FileConfig, MockBackend, StaticDiscovery},
    metrics::{MetricsRegistry, MetricsSnapshot},
    CapturedFrame, Position, SessionError, SessionHandle, SessionWorker,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "camera-session", version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulate a device without a front camera.
    #[arg(long)]
    no_front: bool,

    /// Keep capturing until Ctrl-C.
    #[arg(long)]
    watch: bool,

    /// Milliseconds between captures in watch mode.
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Override the metrics server port (0 disables it).
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("Camera Session v{}", camera_session::VERSION);
    info!("This is a demonstration using simulated cameras");

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(port) = args.metrics_port {
        config.metrics.port = port;
    }

    let discovery = StaticDiscovery::new(config.devices.clone());
    if args.no_front {
        discovery.remove_position(Position::Front);
    }

    let handle = match SessionWorker::spawn(MockBackend::new(), discovery, config.session.clone())
    {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to start session worker: {}", e);
            std::process::exit(1);
        }
    };

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };
    spawn_metrics(&handle, registry, config.metrics.port);

    if let Err(e) = run(&handle, &config, &args).await {
        warn!("Session error: {}", e);
    }

    if let Err(e) = handle.release().await {
        warn!("Release failed: {}", e);
    }

    let snapshot = handle.snapshot();
    info!(
        captures = snapshot.stats.captures,
        switches = snapshot.stats.switches,
        rollbacks = snapshot.stats.rollbacks,
        "Done"
    );
}

async fn run(handle: &SessionHandle, config: &FileConfig, args: &Args) -> Result<(), SessionError> {
    let position = handle.start().await?;
    info!(%position, "Session running");

    report(&handle.capture_photo(config.capture.clone()).await?);

    match handle.switch_camera().await {
        Ok(position) => {
            info!(%position, "Switched camera");
            report(&handle.capture_photo(config.capture.clone()).await?);
        }
        Err(e) => warn!("Switch failed, staying on the {} camera: {}", handle.position(), e),
    }

    if args.watch {
        watch(handle, config, Duration::from_millis(args.interval_ms)).await?;
    }

    handle.stop().await
}

async fn watch(
    handle: &SessionHandle,
    config: &FileConfig,
    interval: Duration,
) -> Result<(), SessionError> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
        warn!("Failed to install Ctrl-C handler: {}", e);
        return Ok(());
    }

    info!("Capturing every {:?}; press Ctrl-C to stop", interval);
    while running.load(Ordering::SeqCst) {
        match handle.capture_photo(config.capture.clone()).await {
            Ok(frame) => report(&frame),
            Err(e) if e.is_hardware_fault() => warn!("Capture failed: {}", e),
            Err(e) => return Err(e),
        }
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

fn report(frame: &CapturedFrame) {
    info!(
        request_id = frame.request_id(),
        position = %frame.position(),
        device = %frame.device_id(),
        width = frame.frame().width(),
        height = frame.frame().height(),
        captured_at = %frame.captured_at(),
        "Captured photo"
    );
}

/// Mirrors every published snapshot into the registry, serving it over
/// HTTP when the `metrics` feature is enabled.
fn spawn_metrics(handle: &SessionHandle, registry: MetricsRegistry, port: u16) {
    let mut snapshots = handle.subscribe();

    #[cfg(feature = "metrics")]
    {
        use camera_session::metrics::{MetricsServer, MetricsServerConfig};

        if port == 0 {
            return;
        }
        let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
        let state = server.state();
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                warn!("Metrics server stopped: {}", e);
            }
        });
        tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let snapshot = MetricsSnapshot::from(&*snapshots.borrow_and_update());
                state.write().await.update(&snapshot);
            }
        });
    }

    #[cfg(not(feature = "metrics"))]
    {
        let _ = port;
        tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let snapshot = MetricsSnapshot::from(&*snapshots.borrow_and_update());
                registry.update(&snapshot);
                if let Ok(text) = registry.encode() {
                    tracing::debug!(metrics = %text, "Metrics updated");
                }
            }
        });
    }
}
