//! Incident sink: persists an emergency as an incident record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tourwatch_server::domain::EmergencyEvent;

pub const SOS_INCIDENT_TYPE: &str = "medical";
pub const SOS_SEVERITY: &str = "critical";
pub const SOS_TITLE: &str = "EMERGENCY SOS ALERT";
pub const SOS_ADDRESS: &str = "Current Location - URGENT EMERGENCY";

/// Body of `POST {incident_api}/incidents/report`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentReport {
    #[serde(rename = "type")]
    pub incident_type: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl IncidentReport {
    /// The record filed for an SOS
    pub fn for_emergency(event: &EmergencyEvent) -> Self {
        let accuracy = event
            .accuracy
            .map(|a| format!("{}m", a.meters().round()))
            .unwrap_or_else(|| "unknown".to_string());
        let phone = event.contact.phone.as_deref().unwrap_or("Not provided");

        Self {
            incident_type: SOS_INCIDENT_TYPE.to_string(),
            severity: SOS_SEVERITY.to_string(),
            title: SOS_TITLE.to_string(),
            description: format!(
                "URGENT: Emergency assistance required by {}! Location accuracy: {}. Phone: {}",
                event.source_display_name.as_str(),
                accuracy,
                phone
            ),
            latitude: event.position.lat(),
            longitude: event.position.lng(),
            address: SOS_ADDRESS.to_string(),
        }
    }
}

/// What the incident API returned
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IncidentRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IncidentSinkError {
    #[error("incident API unreachable: {0}")]
    Transport(String),

    #[error("incident API rejected the report ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IncidentSink: Send + Sync {
    async fn create_incident(
        &self,
        report: IncidentReport,
    ) -> Result<IncidentRecord, IncidentSinkError>;
}

/// Incident sink backed by the REST incident API
pub struct HttpIncidentSink {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpIncidentSink {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/incidents/report", base_url.trim_end_matches('/')),
            token,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl IncidentSink for HttpIncidentSink {
    async fn create_incident(
        &self,
        report: IncidentReport,
    ) -> Result<IncidentRecord, IncidentSinkError> {
        let mut request = self.client.post(&self.endpoint).json(&report);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IncidentSinkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IncidentSinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // A 2xx without a parsable body still counts as persisted
        Ok(response.json::<IncidentRecord>().await.unwrap_or_default())
    }
}
