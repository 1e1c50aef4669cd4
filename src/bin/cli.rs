//! CLI for talking to a replog node

use clap::{Parser, Subcommand};
use replog::client::Client;
use replog::common::{PostMessage, ReplicaDirective, ReplicaRole};

#[derive(Parser)]
#[command(name = "replog")]
#[command(about = "replog replicated log CLI")]
#[command(version)]
struct Cli {
    /// Node URL (master or secondary)
    #[arg(long, default_value = "http://localhost:8080")]
    node: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the node is alive
    Ping,

    /// Print the node's applied messages, one per line
    Messages,

    /// Print a secondary's apply state or the master's health report
    Status,

    /// Post a message
    Post {
        /// Message payload
        message: String,

        /// Write concern (1-3, default 3)
        #[arg(long)]
        w: Option<u8>,

        /// Entry id (direct posts to a secondary only)
        #[arg(long)]
        id: Option<u64>,

        /// Delay in seconds on secondary-1
        #[arg(long, default_value = "0")]
        delay_1: u64,

        /// secondary-1 does not acknowledge
        #[arg(long)]
        noreply_1: bool,

        /// Delay in seconds on secondary-2
        #[arg(long, default_value = "0")]
        delay_2: u64,

        /// secondary-2 does not acknowledge
        #[arg(long)]
        noreply_2: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = Client::connect(cli.node).await?;

    match cli.command {
        Commands::Ping => println!("pong"),

        Commands::Messages => {
            for message in client.get_messages().await? {
                println!("{}", message);
            }
        }

        Commands::Status => {
            let value = match client.get_json("/status").await {
                Ok(value) => value,
                Err(_) => client.get_json("/health").await?,
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }

        Commands::Post {
            message,
            w,
            id,
            delay_1,
            noreply_1,
            delay_2,
            noreply_2,
        } => {
            let mut msg = PostMessage::new(message)
                .with_directive(
                    ReplicaRole::Secondary1,
                    ReplicaDirective {
                        delay: delay_1,
                        noreply: noreply_1,
                    },
                )
                .with_directive(
                    ReplicaRole::Secondary2,
                    ReplicaDirective {
                        delay: delay_2,
                        noreply: noreply_2,
                    },
                );
            msg.w = w;
            msg.id = id;

            client.post_message(&msg).await?;
            println!("OK");
        }
    }

    Ok(())
}
