// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::Parser;
use ocan_config::{load_config, validate_config};
use ocan_daemon::{build_app, build_state};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ocan-daemon", version, about = "OCAN actor runtime daemon")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Enable verbose (debug-level) logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("ocan=debug")
    } else {
        EnvFilter::new("ocan=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = load_config(args.config.as_deref()).context("load daemon config")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    for warning in validate_config(&config).context("validate daemon config")? {
        warn!(%warning, "config advisory");
    }

    let state = build_state(config);
    let bind_addr = state.config.bind_addr.clone();
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("bind {bind_addr}"))?;
    info!(bind = %bind_addr, "ocan-daemon listening");

    axum::serve(listener, app).await.context("serve")
}
