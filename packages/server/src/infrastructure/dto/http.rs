//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

/// Registry entry as exposed over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceDto {
    pub connection_id: String,
    pub user_id: String,
    pub user_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// RFC 3339
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPresenceDto {
    #[serde(flatten)]
    pub presence: PresenceDto,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceListDto {
    /// Open connections
    pub online: usize,
    /// Connections that have reported a position
    pub located: usize,
    pub users: Vec<PresenceDto>,
}

/// Query string of `GET /api/presence/nearby`
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    /// Meters; defaults to 5000
    pub radius: Option<f64>,
}
