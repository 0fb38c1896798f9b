//! CUB Classifier Inference Server
//!
//! Loads the exported model bundle once at startup and serves predictions
//! over HTTP. One route does the work: `POST /predict` takes a multipart
//! image upload and returns the top species with a confidence percentage.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::state::{AppState, ServerConfig};

/// CUB Classifier Inference Server
#[derive(Parser, Debug)]
#[command(name = "cub-classifier-server")]
#[command(version)]
#[command(about = "HTTP inference server for the CUB-200-2011 bird classifier")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Path to the exported model bundle
    #[arg(long, env = "CUB_CLASSIFIER_BUNDLE", default_value = "model/export")]
    bundle_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("CUB Classifier Server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Bundle: {:?}", cli.bundle_dir);

    // Load the model once; requests share the read-only predictor
    let config = ServerConfig {
        bundle_dir: cli.bundle_dir,
    };
    let state = Arc::new(AppState::new(config)?);
    info!(
        "Model loaded: {} species",
        state.predictor.vocab().len()
    );

    // Build router with fully open CORS for the frontend
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/predict", post(routes::predict::predict))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
