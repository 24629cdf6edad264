use anyhow::{Context, Result};
use clap::Parser;
use parley_interview::avatar::player::SimulatedPlayerFactory;
use parley_interview::media::SyntheticBackend;
use parley_interview::{create_router, AppState, Config, HttpInterviewApi};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "parley-interview", about = "Mock interview session orchestrator")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(short, long, default_value = "config/parley-interview")]
    config: String,

    /// Override the configured HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Remote interview backend: {}", cfg.remote.base_url);

    let api = Arc::new(HttpInterviewApi::new(&cfg.remote)?);

    // Capture and playback are platform seams; the built-in implementations
    // cover dry runs and tests.
    let state = AppState::new(
        api,
        Arc::new(SyntheticBackend::default()),
        Arc::new(SimulatedPlayerFactory),
        cfg.session.clone(),
        cfg.stream.clone(),
    );

    let app = create_router(state);
    let addr = format!("{}:{}", cfg.service.http.bind, port);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app).await?;

    Ok(())
}
