//! Master binary

use clap::Parser;
use replog::{common::Config, MasterServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "replog-master")]
#[command(about = "replog master: sequences messages and replicates them")]
#[command(version)]
struct Args {
    /// Config file (TOML); `replog.toml` is used if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node ID
    #[arg(long)]
    id: Option<String>,

    /// Bind address for HTTP
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Base URL of secondary-1
    #[arg(long)]
    secondary_1: Option<String>,

    /// Base URL of secondary-2
    #[arg(long)]
    secondary_2: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // File and environment first, CLI arguments win
    let config = Config::load(args.config.as_deref())?;
    let mut master = config.master_or_default();
    if let Some(bind) = args.bind {
        master.bind_addr = bind;
    }
    if let Some(url) = args.secondary_1 {
        master.secondary_1 = url;
    }
    if let Some(url) = args.secondary_2 {
        master.secondary_2 = url;
    }
    let log_level = args.log_level.unwrap_or(config.log_level);
    let node_id = args.id.unwrap_or(config.node_id);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server = MasterServer::new(master, node_id)?;
    server.serve().await?;

    Ok(())
}
