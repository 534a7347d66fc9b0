// crates/server/src/main.rs
//! Trainview server binary.
//!
//! Serves the dashboard API and training stream. Training only begins when
//! a client calls `/start-training`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use trainview_server::jobs::SyntheticProducer;
use trainview_server::{create_app, init_metrics, AppState};

/// Default port for the server.
const DEFAULT_PORT: u16 = 8000;

/// Training dashboard backend.
#[derive(Parser, Debug)]
#[command(name = "trainview")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to bind. Falls back to TRAINVIEW_PORT, then PORT, then 8000.
    #[arg(short, long)]
    port: Option<u16>,

    /// Delay between synthetic training epochs, in milliseconds.
    #[arg(long, default_value_t = 500)]
    step_delay_ms: u64,
}

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("TRAINVIEW_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown requested");
    state.shutdown();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,trainview_server=info,trainview_core=info".into()),
        )
        .init();

    let args = Args::parse();

    init_metrics();

    let producer = Arc::new(SyntheticProducer::new(Duration::from_millis(args.step_delay_ms)));
    let state = AppState::new(producer);
    let app = create_app(state.clone());

    let port = args.port.unwrap_or_else(get_port);
    let addr = SocketAddr::new(args.host, port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "Backend ready, waiting for training to be started via /start-training");
    eprintln!("\n  trainview v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  \u{2192} http://{addr}\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}
