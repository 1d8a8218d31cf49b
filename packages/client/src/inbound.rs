//! Handling of frames received from the hub.

use std::sync::Arc;

use tokio::sync::Mutex;
use tourwatch_server::{
    domain::{Coordinates, EmergencyEvent, LocationUpdate, UserId},
    infrastructure::dto::websocket::ServerMessage,
};

use crate::{
    dedup::NotificationDeduplicator, formatter::sos_notification, position::LatestPosition,
    relevance::{Relevance, RelevanceFilter},
};

/// An SOS that passed the relevance filter
#[derive(Debug, Clone, PartialEq)]
pub struct SurfacedAlert {
    pub event: EmergencyEvent,
    pub distance_meters: f64,
    /// Own position at decision time
    pub own: Coordinates,
}

/// What a received frame amounted to
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Connected { connection_id: String, online: usize },
    Presence { user_id: UserId, relevance: Relevance },
    Alert(SurfacedAlert),
    AlertSuppressed { user_id: UserId, relevance: Relevance },
    /// Same notification already shown within the dedup window
    DuplicateAlert,
    /// Unparsable or invalid frame
    Dropped,
}

#[derive(Clone)]
pub struct InboundHandler {
    relevance: Arc<Mutex<RelevanceFilter>>,
    dedup: Arc<Mutex<NotificationDeduplicator>>,
    latest: LatestPosition,
}

impl InboundHandler {
    pub fn new(
        relevance: Arc<Mutex<RelevanceFilter>>,
        dedup: Arc<Mutex<NotificationDeduplicator>>,
        latest: LatestPosition,
    ) -> Self {
        Self {
            relevance,
            dedup,
            latest,
        }
    }

    pub async fn handle_text(&self, text: &str) -> InboundEvent {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                tracing::warn!("Dropping unparsable frame from server: {}", e);
                InboundEvent::Dropped
            }
        }
    }

    pub async fn handle_message(&self, message: ServerMessage) -> InboundEvent {
        let own = self.latest.coordinates();

        match message {
            ServerMessage::Connected(payload) => InboundEvent::Connected {
                connection_id: payload.connection_id,
                online: payload.online,
            },
            ServerMessage::UserLocation(payload) => {
                let update = match LocationUpdate::try_from(payload) {
                    Ok(update) => update,
                    Err(e) => {
                        tracing::warn!("Dropping invalid user-location: {}", e);
                        return InboundEvent::Dropped;
                    }
                };
                let user_id = update.user_id.clone();
                let relevance = self
                    .relevance
                    .lock()
                    .await
                    .on_user_location(own.as_ref(), update);
                InboundEvent::Presence { user_id, relevance }
            }
            ServerMessage::SosAlert(payload) => {
                let event = match EmergencyEvent::try_from(payload) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("Dropping invalid sos-alert: {}", e);
                        return InboundEvent::Dropped;
                    }
                };
                let relevance = self.relevance.lock().await.on_sos_alert(own.as_ref(), &event);

                let (Relevance::Relevant { distance_meters }, Some(own)) = (relevance, own) else {
                    tracing::debug!(
                        "sos-alert from '{}' not surfaced: {:?}",
                        event.source_user_id.as_str(),
                        relevance
                    );
                    return InboundEvent::AlertSuppressed {
                        user_id: event.source_user_id,
                        relevance,
                    };
                };

                let notification =
                    sos_notification(event.source_display_name.as_str(), distance_meters);
                if !self.dedup.lock().await.should_notify(&notification) {
                    return InboundEvent::DuplicateAlert;
                }

                InboundEvent::Alert(SurfacedAlert {
                    event,
                    distance_meters,
                    own,
                })
            }
        }
    }
}
