//! Tourwatch safety client.
//!
//! Shares your position with the hub, shows SOS alerts raised within the
//! alert radius, and raises your own SOS with `/sos`.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tourwatch-client -- --user-id u-42 --user-name Alice --lat 31.2526 --lng 75.7044
//! ```

use std::time::Duration;

use clap::Parser;
use tourwatch_client::{config::ClientConfig, error::ClientError, run_client};
use tourwatch_server::domain::ContactInfo;
use tourwatch_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tourwatch-client")]
#[command(about = "Presence sharing and SOS alert client", long_about = None)]
struct Args {
    /// Your user id (from the account system)
    #[arg(short = 'i', long, env = "TOURWATCH_USER_ID")]
    user_id: String,

    /// Name shown to others
    #[arg(short = 'n', long, env = "TOURWATCH_USER_NAME")]
    user_name: Option<String>,

    /// WebSocket server URL
    #[arg(short = 'u', long, env = "TOURWATCH_URL", default_value = "ws://127.0.0.1:5000/ws")]
    url: String,

    /// Base URL of the incident API
    #[arg(long, env = "TOURWATCH_INCIDENT_API", default_value = "http://127.0.0.1:5000/api")]
    incident_api: String,

    /// Bearer token for the incident API
    #[arg(long, env = "TOURWATCH_TOKEN")]
    token: Option<String>,

    /// Contact email attached to your SOS
    #[arg(long, env = "TOURWATCH_EMAIL")]
    email: Option<String>,

    /// Contact phone attached to your SOS
    #[arg(long, env = "TOURWATCH_PHONE")]
    phone: Option<String>,

    /// Alert radius in meters
    #[arg(short = 'r', long, env = "TOURWATCH_RADIUS", default_value_t = 5000.0)]
    radius: f64,

    /// Seconds to wait for a position fix when raising an SOS
    #[arg(long, default_value_t = 5)]
    position_timeout_secs: u64,

    /// Seconds after which a silent nearby user is forgotten
    #[arg(long, default_value_t = 120)]
    nearby_ttl_secs: u64,

    /// Starting latitude
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Starting longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lng: Option<f64>,

    /// Accuracy of the starting position in meters
    #[arg(long)]
    accuracy: Option<f64>,
}

impl TryFrom<Args> for ClientConfig {
    type Error = ClientError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let mut config =
            ClientConfig::new(&args.user_id, args.user_name.as_deref())?.with_radius(args.radius)?;
        config.url = args.url;
        config.incident_api = args.incident_api;
        config.token = args.token;
        config.contact = ContactInfo::new(args.email, args.phone);
        config.position_timeout = Duration::from_secs(args.position_timeout_secs.max(1));
        config.nearby_ttl = Duration::from_secs(args.nearby_ttl_secs);
        config.initial_position = args.lat.zip(args.lng).map(|(lat, lng)| (lat, lng, args.accuracy));
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let config = match ClientConfig::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    // Run the client
    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
