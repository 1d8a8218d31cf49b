//! Real-time presence and emergency-alert fan-out hub.
//!
//! Connected clients report their position and raise SOS events; the hub
//! keeps a presence registry of last-known positions and relays both event
//! kinds to every other open connection. Relevance filtering by distance is
//! done by the receiving client.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
