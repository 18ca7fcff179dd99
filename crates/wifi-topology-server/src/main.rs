//! WiFi topology server binary.
//!
//! Live mode serves the WebSocket stream and REST API; `--analyze` runs
//! headless and prints a report.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wifi_topology_core::{SnapshotRecorder, TopologyPipeline};
use wifi_topology_server::analyze::run_analyze;
use wifi_topology_server::error::{ServerError, EXIT_FAILURE};
use wifi_topology_server::live::run_live;
use wifi_topology_server::replay::start_replay;
use wifi_topology_server::report::render;
use wifi_topology_server::scanner::{build_scanner, resolve_source};
use wifi_topology_server::{http, AppStateInner, Args};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so an analyze report on stdout stays clean.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            let code = e
                .downcast_ref::<ServerError>()
                .map(ServerError::exit_code)
                .unwrap_or(EXIT_FAILURE);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.pipeline_config().map_err(ServerError::from)?;
    let source = resolve_source(&args).await;
    let scanner = build_scanner(source, &args);

    if let Some(secs) = args.analyze {
        let summary = run_analyze(scanner, config, Duration::from_secs(secs)).await?;
        let text = render(&summary, args.report_format)?;
        match &args.out {
            Some(path) => {
                std::fs::write(path, text)
                    .with_context(|| format!("writing report to {}", path.display()))?;
                info!("report written to {}", path.display());
            }
            None => println!("{text}"),
        }
        return Ok(());
    }

    let pipeline = TopologyPipeline::new(config, scanner.source()).map_err(ServerError::from)?;
    let mut inner = AppStateInner::new(pipeline).with_recordings_dir(args.recordings_dir.clone());
    if let Some(path) = &args.record {
        inner.start_recording(SnapshotRecorder::open(path).map_err(ServerError::from)?);
    }
    let state = inner.into_shared();

    if let Some(path) = &args.replay {
        start_replay(&state, path.clone(), args.replay_speed, args.replay_loop).await?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let live = tokio::spawn(run_live(state.clone(), scanner, shutdown_rx));

    let app = http::router(state.clone(), args.ui_path.clone());
    let addr = SocketAddr::from((args.bind, args.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP port {}", args.http_port))?;
    info!("HTTP server listening on {addr}");
    info!("WebSocket stream at ws://{addr}/ws");
    if args.ui_path.is_some() {
        info!("Open http://{addr}/ui/index.html in your browser");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = live.await {
        error!("live driver task failed: {e}");
    }
    let s = state.read().await;
    info!(
        "stopped after {} ticks, {} snapshots published",
        s.pipeline.ticks(),
        s.published
    );
    Ok(())
}
