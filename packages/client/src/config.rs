//! Client runtime configuration.

use std::time::Duration;

use tourwatch_server::domain::{ContactInfo, DEFAULT_RADIUS_METERS, DisplayName, UserId};

use crate::error::ClientError;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:5000/ws";
pub const DEFAULT_INCIDENT_API: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_POSITION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_NEARBY_TTL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub contact: ContactInfo,
    /// WebSocket endpoint of the hub
    pub url: String,
    /// Base URL of the incident API
    pub incident_api: String,
    /// Bearer token for the incident API
    pub token: Option<String>,
    /// Events at or beyond this distance are not surfaced
    pub radius_meters: f64,
    pub position_timeout: Duration,
    /// Nearby users without a fresh update for this long are dropped
    pub nearby_ttl: Duration,
    /// (lat, lng, accuracy) known at startup
    pub initial_position: Option<(f64, f64, Option<f64>)>,
}

impl ClientConfig {
    /// Config with every optional setting at its default
    pub fn new(user_id: &str, user_name: Option<&str>) -> Result<Self, ClientError> {
        let user_id = UserId::new(user_id.to_string())
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        let display_name = DisplayName::or_default(user_name.unwrap_or_default().to_string())
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            user_id,
            display_name,
            contact: ContactInfo::default(),
            url: DEFAULT_URL.to_string(),
            incident_api: DEFAULT_INCIDENT_API.to_string(),
            token: None,
            radius_meters: DEFAULT_RADIUS_METERS,
            position_timeout: DEFAULT_POSITION_TIMEOUT,
            nearby_ttl: DEFAULT_NEARBY_TTL,
            initial_position: None,
        })
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Result<Self, ClientError> {
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(ClientError::InvalidConfig(format!(
                "radius must be a positive number of meters, got {}",
                radius_meters
            )));
        }
        self.radius_meters = radius_meters;
        Ok(self)
    }
}
