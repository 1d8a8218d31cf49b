//! Presence and emergency-alert fan-out server.
//!
//! Relays `location-update` and `emergency-sos` events from each client to
//! every other connected client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tourwatch-server
//! cargo run --bin tourwatch-server -- --host 0.0.0.0 --port 5000
//! ```

use clap::Parser;
use tourwatch_server::ui::{Server, ServerConfig};
use tourwatch_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tourwatch-server")]
#[command(about = "Presence and SOS fan-out server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "TOURWATCH_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "TOURWATCH_PORT", default_value_t = 5000)]
    port: u16,

    /// Outbound queue capacity per connection (messages)
    #[arg(long, env = "TOURWATCH_OUTBOUND_BUFFER", default_value_t = 64)]
    outbound_buffer: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            outbound_buffer: args.outbound_buffer,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let server = Server::in_memory(args.into());
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
