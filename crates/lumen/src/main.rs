//! Lumen - S3-backed image captioning upload service.
//!
//! Lumen accepts image uploads over HTTP, stores them in an S3 bucket,
//! requests a caption for each image from a remote prediction API, renames
//! the stored object after the caption, and returns the resulting URLs and
//! captions; batch uploads also produce a CSV manifest.
//!
//! # Usage
//!
//! ```bash
//! # Start the server (configuration comes from the environment / .env)
//! lumen
//!
//! # Bind elsewhere, with JSON logs
//! lumen --bind 127.0.0.1:8080 --json-logs
//! ```

use clap::Parser;
use lumen_core::{Pipeline, ReplicateCaptioner, S3Store};
use std::sync::Arc;

mod logging;
mod server;

/// Lumen - S3-backed image captioning upload service.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "LUMEN_BIND", default_value = "0.0.0.0:1323")]
    bind: String,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A .env file is optional; the process environment wins either way.
    dotenvy::dotenv().ok();

    logging::init(cli.verbose, cli.json_logs);

    // Missing required variables abort startup here, naming all of them.
    let config = lumen_core::Config::from_env()?;

    tracing::info!("Starting lumen v{}", lumen_core::VERSION);

    let pipeline = Pipeline::new(
        Arc::new(S3Store::new(&config.storage)),
        Arc::new(ReplicateCaptioner::new(&config.caption)),
        config.storage.poll_settings(),
    );

    server::serve(&cli.bind, pipeline, &config.server).await
}
