//! Conversion logic between DTOs and domain entities.
//!
//! Inbound conversions validate: a payload that fails here is malformed and
//! is dropped by the caller. An SOS is only malformed when its coordinates are
//! invalid or its sender id is blank; its other fields fall back to defaults.

use tourwatch_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    Accuracy, AlertMessage, ContactInfo, Coordinates, DisplayName, EmergencyEvent, LocationUpdate,
    PositionReport, PresenceRecord, Timestamp, UserId, ValueObjectError,
};
use crate::infrastructure::dto::{http, websocket as dto};

fn accuracy(value: Option<f64>) -> Result<Option<Accuracy>, ValueObjectError> {
    value.map(Accuracy::new).transpose()
}

/// Invalid accuracy is dropped
fn accuracy_or_none(value: Option<f64>) -> Option<Accuracy> {
    value.and_then(|meters| Accuracy::new(meters).ok())
}

// ========================================
// DTO → Domain Entity
// ========================================

impl dto::LocationUpdatePayload {
    /// Validate into a [`LocationUpdate`]; `received_at` is used when the
    /// client sent no capture time.
    pub fn into_domain(self, received_at: Timestamp) -> Result<LocationUpdate, ValueObjectError> {
        Ok(LocationUpdate {
            user_id: UserId::new(self.user_id)?,
            display_name: DisplayName::or_default(self.user_name)?,
            position: PositionReport::new(
                Coordinates::new(self.lat, self.lng)?,
                accuracy(self.accuracy)?,
                self.timestamp.map(Timestamp::new).unwrap_or(received_at),
            ),
        })
    }
}

impl TryFrom<dto::EmergencySosPayload> for EmergencyEvent {
    type Error = ValueObjectError;

    fn try_from(dto: dto::EmergencySosPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            source_user_id: UserId::truncated(dto.user_id)?,
            source_display_name: DisplayName::or_fallback(dto.user_name),
            position: Coordinates::new(dto.lat, dto.lng)?,
            accuracy: accuracy_or_none(dto.accuracy),
            emitted_at: dto.timestamp.map(Timestamp::new),
            message: AlertMessage::or_default(dto.message),
            contact: ContactInfo::new(dto.user_email, dto.user_phone),
        })
    }
}

impl TryFrom<dto::UserLocationPayload> for LocationUpdate {
    type Error = ValueObjectError;

    fn try_from(dto: dto::UserLocationPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::new(dto.user_id)?,
            display_name: DisplayName::or_default(dto.user_name)?,
            position: PositionReport::new(
                Coordinates::new(dto.lat, dto.lng)?,
                accuracy(dto.accuracy)?,
                Timestamp::new(dto.timestamp),
            ),
        })
    }
}

impl TryFrom<dto::SosAlertPayload> for EmergencyEvent {
    type Error = ValueObjectError;

    fn try_from(dto: dto::SosAlertPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            source_user_id: UserId::truncated(dto.user_id)?,
            source_display_name: DisplayName::or_fallback(dto.user_name),
            position: Coordinates::new(dto.lat, dto.lng)?,
            accuracy: accuracy_or_none(dto.accuracy),
            emitted_at: Some(Timestamp::new(dto.timestamp)),
            message: AlertMessage::or_default(dto.message),
            contact: ContactInfo::new(dto.user_email, dto.user_phone),
        })
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&LocationUpdate> for dto::LocationUpdatePayload {
    fn from(model: &LocationUpdate) -> Self {
        Self {
            user_id: model.user_id.as_str().to_string(),
            user_name: model.display_name.as_str().to_string(),
            lat: model.position.coordinates.lat(),
            lng: model.position.coordinates.lng(),
            accuracy: model.position.accuracy.map(|a| a.meters()),
            timestamp: Some(model.position.timestamp.value()),
        }
    }
}

impl From<&EmergencyEvent> for dto::EmergencySosPayload {
    fn from(model: &EmergencyEvent) -> Self {
        Self {
            user_id: model.source_user_id.as_str().to_string(),
            user_name: model.source_display_name.as_str().to_string(),
            lat: model.position.lat(),
            lng: model.position.lng(),
            accuracy: model.accuracy.map(|a| a.meters()),
            timestamp: model.emitted_at.map(|t| t.value()),
            message: model.message.as_str().to_string(),
            user_email: model.contact.email.clone(),
            user_phone: model.contact.phone.clone(),
        }
    }
}

impl From<&PresenceRecord> for dto::UserLocationPayload {
    fn from(model: &PresenceRecord) -> Self {
        Self {
            user_id: model.user_id.as_str().to_string(),
            user_name: model.display_name.as_str().to_string(),
            lat: model.position.coordinates.lat(),
            lng: model.position.coordinates.lng(),
            accuracy: model.position.accuracy.map(|a| a.meters()),
            timestamp: model.position.timestamp.value(),
        }
    }
}

/// Expects a stamped event; an unstamped one is sent with timestamp 0.
impl From<&EmergencyEvent> for dto::SosAlertPayload {
    fn from(model: &EmergencyEvent) -> Self {
        Self {
            user_id: model.source_user_id.as_str().to_string(),
            user_name: model.source_display_name.as_str().to_string(),
            lat: model.position.lat(),
            lng: model.position.lng(),
            accuracy: model.accuracy.map(|a| a.meters()),
            timestamp: model.emitted_at.map(|t| t.value()).unwrap_or_default(),
            message: model.message.as_str().to_string(),
            user_email: model.contact.email.clone(),
            user_phone: model.contact.phone.clone(),
        }
    }
}

impl From<&PresenceRecord> for http::PresenceDto {
    fn from(model: &PresenceRecord) -> Self {
        Self {
            connection_id: model.connection_id.as_str().to_string(),
            user_id: model.user_id.as_str().to_string(),
            user_name: model.display_name.as_str().to_string(),
            lat: model.position.coordinates.lat(),
            lng: model.position.coordinates.lng(),
            accuracy: model.position.accuracy.map(|a| a.meters()),
            updated_at: timestamp_to_rfc3339(model.position.timestamp.value()),
        }
    }
}
