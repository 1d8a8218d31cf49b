//! UI layer: axum router, WebSocket and HTTP handlers.

mod config;
mod handler;
mod server;
mod signal;
pub mod state;

pub use config::ServerConfig;
pub use server::Server;
