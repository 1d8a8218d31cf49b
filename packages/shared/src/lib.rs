//! Shared building blocks for the Tourwatch server and client.
//!
//! - `geo`: great-circle distance used by both sides of the relevance decision
//! - `time`: clock abstraction and timestamp formatting
//! - `logger`: tracing subscriber setup for the binaries

pub mod geo;
pub mod logger;
pub mod time;
