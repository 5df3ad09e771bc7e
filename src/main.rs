//! Bulletin Board Server - Entry Point
//!
//! Parses flags, starts the state actor and accepts connections.

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bulletin_server::config::{default_rooms, DEFAULT_ADDR};
use bulletin_server::{bind_and_serve, Framing, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "bulletin_server")]
#[command(about = "Multi-user bulletin board and chat room server", long_about = None)]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Wire framing spoken by clients
    #[arg(short, long, value_enum, default_value_t = Framing::Text)]
    framing: Framing,

    /// Public board capacity (defaults to 5 for text, 2 for json)
    #[arg(short, long)]
    board_size: Option<usize>,

    /// Comma-separated room names (defaults to Room1..Room5)
    #[arg(short, long, value_delimiter = ',')]
    rooms: Vec<String>,

    /// Per-client outbound queue depth
    #[arg(long, default_value_t = 64)]
    outbound_buffer: usize,

    /// Socket write timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    write_timeout_ms: u64,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::for_framing(self.framing);
        config.addr = self.addr;
        if let Some(size) = self.board_size {
            config.board_capacity = size;
        }
        config.rooms = if self.rooms.is_empty() {
            default_rooms()
        } else {
            self.rooms
        };
        config.outbound_buffer = self.outbound_buffer;
        config.write_timeout = Duration::from_millis(self.write_timeout_ms);
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=bulletin_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bulletin_server=info")),
        )
        .init();

    let config = Args::parse().into_config();
    info!(
        "Board capacity {}, rooms: {}",
        config.board_capacity,
        config.rooms.join(", ")
    );

    bind_and_serve(config).await?;
    Ok(())
}
