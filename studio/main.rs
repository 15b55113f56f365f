//! ferrite-face Studio
//!
//! A small HTTP front end for the face-attribute pipeline: upload labelled
//! face images to train, then upload a single face to predict age, gender
//! and race. Served by a synchronous tiny_http server.
//!
//! Run with:
//!   cargo run --bin studio --release -- --addr 127.0.0.1:7878
//!
//! Endpoints:
//!   POST /train       multipart `files` (+ optional `epochs`, `batch_size`); SSE progress
//!   POST /train/stop  request a stop between epochs
//!   POST /predict     multipart `image`; JSON prediction
//!   GET  /status      busy flag, model presence, last prediction, status line

mod state;
mod routes;
mod handlers;
mod util;

use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tiny_http::Server;
use tracing_subscriber::EnvFilter;

use ferrite_face::PipelineConfig;
use state::StudioState;

#[derive(Parser, Debug)]
#[command(name = "studio", about = "Face-attribute training and prediction server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:7878")]
    addr: String,

    /// Pipeline configuration (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load_json(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => PipelineConfig::default(),
    };

    let server = Server::http(&args.addr).map_err(|e| anyhow!("failed to bind {}: {e}", args.addr))?;
    let shared_state = Arc::new(StudioState::new(config));

    tracing::info!(addr = %args.addr, "studio listening");

    // Each request is dispatched on its own thread so the SSE handler
    // (which blocks for the entire training duration) does not stall
    // predictions and status polls.
    for request in server.incoming_requests() {
        let state_clone = shared_state.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, state_clone);
        });
    }
    Ok(())
}
