//! hostpulse - version 0.1.0
//!
//! Resilient host metrics sampler with live SSE streaming.
//! This is the main entry point that initializes the server and handles subcommands.

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{routing::get, Router};
use clap::Parser;
use tokio::{net::TcpListener, signal, sync::Mutex};
use tracing::{error, info, Level};

use hostpulse::broadcast::Broadcaster;
use hostpulse::cli::{Args, Commands, LogLevel};
use hostpulse::client::{
    ConnectionStatus, HttpTransport, ReconnectPolicy, SseClient,
};
use hostpulse::collector::Orchestrator;
use hostpulse::config::{resolve_config, show_config, validate_effective_config, Config};
use hostpulse::handlers::{health_handler, root_handler, snapshot_handler, stream_handler};
use hostpulse::providers::ProcProvider;
use hostpulse::sampler;
use hostpulse::snapshot::{Snapshot, SnapshotService};
use hostpulse::state::{AppState, SharedState};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// Prints one arriving snapshot in the requested form.
fn print_snapshot(snapshot: &Snapshot, raw: bool) {
    if raw {
        match serde_json::to_string(snapshot) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("failed to re-serialize snapshot: {}", e),
        }
        return;
    }

    let cpu = snapshot
        .cpu
        .data
        .as_ref()
        .map(|c| format!("{:.1}%", c.usage_percent))
        .unwrap_or_else(|| "n/a".to_string());
    let memory = snapshot
        .memory
        .data
        .as_ref()
        .map(|m| format!("{:.1}%", m.used_percent))
        .unwrap_or_else(|| "n/a".to_string());

    println!(
        "{} status={:?} cpu={} memory={}",
        snapshot.timestamp, snapshot.status, cpu, memory
    );
}

/// Runs the `watch` subcommand: subscribe to a server and print snapshots
/// until Ctrl+C.
async fn command_watch(url: String, raw: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Subscribing to {}", url);

    let transport = HttpTransport::new(url);
    let (client, handle) = SseClient::new(transport, ReconnectPolicy::default());
    let client = client
        .on_status(|status: ConnectionStatus| eprintln!("[{}]", status.as_str()))
        .on_snapshot(move |snapshot| print_snapshot(&snapshot, raw));

    let runner = tokio::spawn(client.run());

    signal::ctrl_c().await?;
    info!("Received SIGINT (Ctrl+C), shutting down watch");
    handle.shutdown();

    runner.await?;
    Ok(())
}

/// Runs the server: sampler task plus the HTTP/SSE surface.
async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting hostpulse");

    let bind = config.effective_bind().to_string();
    let port = config.effective_port();
    let deadline = Duration::from_millis(config.effective_collect_timeout_ms());

    let orchestrator = Orchestrator::with_deadline(ProcProvider::new(), deadline);
    let service = SnapshotService::new(orchestrator);

    let state: SharedState = Arc::new(AppState {
        service: Mutex::new(service),
        broadcaster: Broadcaster::new(),
        config: Arc::new(config),
        cycles: AtomicU64::new(0),
        start_time: Instant::now(),
    });

    let sampler_task = tokio::spawn(sampler::run(state.clone()));

    // Setup graceful shutdown signal handlers
    let shutdown_signal = async {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/api/stream", get(stream_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("hostpulse listening on http://{}:{}", bind, port);

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                sampler_task.abort();
                return Err(e.into());
            }
        }
        _ = shutdown_signal => {
            info!("Shutdown signal received, exiting...");
        }
    }

    sampler_task.abort();
    info!("hostpulse stopped gracefully");
    Ok(())
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format).map_err(Into::into);
    }

    if let Some(Commands::Watch { url, raw }) = &args.command {
        setup_logging(&args);
        return command_watch(url.clone(), *raw).await;
    }

    let config = resolve_config(&args)?;

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(&args);

    run_server(config).await
}
