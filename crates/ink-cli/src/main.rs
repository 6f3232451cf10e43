#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use ink_server::handler;
use ink_server::service::{AiPorts, ServiceState};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Command, GatewayArgs};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "ink_cli::startup";
pub const TRACING_TARGET_SERVER: &str = "ink_cli::server";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    // local development reads .env; missing files are fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing();
    log_startup_info();

    match cli.command {
        Command::Serve(args) => serve_http(args).await,
        Command::Mcp(args) => serve_mcp(args).await,
    }
}

/// Runs the HTTP gateway.
async fn serve_http(args: GatewayArgs) -> anyhow::Result<()> {
    let state = create_state(&args).await?;
    let port = state.config().server.port;
    let router = create_router(state);

    server::serve(router, port).await
}

/// Runs the stdio tool server.
async fn serve_mcp(args: GatewayArgs) -> anyhow::Result<()> {
    let state = create_state(&args).await?;
    let registry = ink_mcp::register_tools(&state);
    let mcp = ink_mcp::McpServer::new(state, registry);

    mcp.run(tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("tool server transport failed")
}

/// Assembles the service state from configuration and AI ports.
async fn create_state(args: &GatewayArgs) -> anyhow::Result<ServiceState> {
    let config = args.service_config()?;
    let ports = create_ports(args)?;

    ServiceState::from_config(config, ports)
        .await
        .context("failed to create service state")
}

/// Wires the AI ports: mocks when requested, rig providers otherwise.
fn create_ports(args: &GatewayArgs) -> anyhow::Result<AiPorts> {
    if args.mock_ai {
        tracing::warn!(
            target: TRACING_TARGET_STARTUP,
            "Running with deterministic mock AI ports"
        );
        let embedder = Arc::new(ink_core::mock::MockEmbedder::new(args.embedding_dimension));
        return Ok(AiPorts {
            text_embedder: embedder.clone(),
            image_embedder: embedder,
            vision: Some(Arc::new(ink_core::mock::MockVision::new())),
        });
    }

    let embedding = args.embedding_config();
    let text_embedder =
        Arc::new(ink_rig::RigTextEmbedder::new(&embedding).context("text embedder")?);
    let image_embedder =
        Arc::new(ink_rig::HttpImageEmbedder::new(&embedding).context("image embedder")?);

    let vision = match args.vision_config() {
        Some(vision_config) => Some(Arc::new(
            ink_rig::RigVisionAnalyzer::new(&vision_config).context("vision analyzer")?,
        ) as Arc<dyn ink_core::vision::VisionAnalyzer>),
        None => {
            tracing::info!(
                target: TRACING_TARGET_STARTUP,
                "No vision API key configured, vision features disabled"
            );
            None
        }
    };

    Ok(AiPorts {
        text_embedder,
        image_embedder,
        vision,
    })
}

/// Creates the router with all middleware layers applied.
fn create_router(state: ServiceState) -> Router {
    let request_timeout = state.config().server.request_timeout();

    let mut api = aide::openapi::OpenApi::default();
    handler::routes(state.clone())
        .finish_api(&mut api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

/// Initializes tracing with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Logs startup information.
fn log_startup_info() {
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting ink gateway"
    );

    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        pid = process::id(),
        arch = std::env::consts::ARCH,
        os = std::env::consts::OS,
        "build information"
    );
}
