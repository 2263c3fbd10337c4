//! ARK RPC Server - HTTP/JSON backend for the server panel.
//!
//! Wraps `ark-core` and `ark-installer` behind the `/api/...` routes the
//! panel frontend calls.

mod handlers;
mod server;

use anyhow::Result;
use ark_core::config::{AppConfig, InstallerConfig, PathsConfig};
use ark_core::ArkPanel;
use ark_installer::{FetchToolConfig, Installer};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "ark-rpc")]
#[command(about = "HTTP server for the ARK server panel")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = AppConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = AppConfig::DEFAULT_HOST)]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Directory holding `config/` and `logs/`
    #[arg(long, default_value = AppConfig::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Base directory for the default server installs
    #[arg(long, default_value = PathsConfig::DEFAULT_SERVERS_BASE)]
    servers_base: PathBuf,

    /// Path to steamcmd.sh
    #[arg(long, default_value = InstallerConfig::STEAMCMD_PATH)]
    steamcmd: PathBuf,

    /// Branch installed when a request names none
    #[arg(long, default_value = InstallerConfig::DEFAULT_BRANCH)]
    branch: String,

    /// Run SteamCMD as this user through sudo (empty = current user)
    #[arg(long, default_value = InstallerConfig::RUN_AS_USER)]
    run_as: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting {}", AppConfig::APP_NAME);
    info!("Data directory: {}", args.data_dir.display());

    let panel = ArkPanel::builder(&args.data_dir)
        .servers_base(&args.servers_base)
        .auto_create_dirs(true)
        .build()?;

    let fetch = FetchToolConfig::new(&args.steamcmd)
        .with_default_branch(args.branch.clone())
        .with_run_as(Some(args.run_as.clone()));
    let installer = Installer::new(fetch, panel.logs().clone());

    let addr = server::start_server(panel, installer, &args.host, args.port).await?;
    info!("Panel API running on http://{}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
