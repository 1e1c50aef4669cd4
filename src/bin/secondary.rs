//! Secondary binary

use clap::Parser;
use replog::common::{Config, ReplicaRole};
use replog::SecondaryServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "replog-secondary")]
#[command(about = "replog secondary: applies replicated entries in order")]
#[command(version)]
struct Args {
    /// Config file (TOML); `replog.toml` is used if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node ID
    #[arg(long)]
    id: Option<String>,

    /// Directive slot this node obeys (secondary-1 or secondary-2)
    #[arg(long)]
    role: Option<ReplicaRole>,

    /// Bind address for HTTP
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Milliseconds a buffered entry waits for its gap before a negative ack
    #[arg(long)]
    apply_wait_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let mut secondary = config.secondary_or_default();
    if let Some(role) = args.role {
        secondary.role = role;
    }
    if let Some(bind) = args.bind {
        secondary.bind_addr = bind;
    }
    if let Some(ms) = args.apply_wait_timeout_ms {
        secondary.apply_wait_timeout_ms = ms;
    }
    let log_level = args.log_level.unwrap_or(config.log_level);
    let node_id = args.id.unwrap_or_else(|| secondary.role.to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    SecondaryServer::new(secondary, node_id).serve().await?;

    Ok(())
}
