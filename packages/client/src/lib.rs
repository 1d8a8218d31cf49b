//! Tourwatch safety client.
//!
//! Shares the user's position with the hub, filters incoming `user-location`
//! and `sos-alert` broadcasts down to the ones within the relevance radius,
//! and runs the emergency alert flow when the user raises an SOS.

pub mod alert_flow;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod inbound;
pub mod incident;
pub mod position;
pub mod relevance;
pub mod runner;
mod session;
mod ui;

pub use runner::run_client;
