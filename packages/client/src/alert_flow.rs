//! Emergency alert flow.
//!
//! ```text
//! Idle -> AcquiringPosition -> Emitting -> AwaitingPersistConfirm -> Done
//!              |                  |                  |
//!              v                  v                  v
//!   AcquiringPositionFailed   EmitFailed        PersistFailed
//! ```
//!
//! The broadcast goes out as soon as a position is known, and counts as sent
//! once the connection writer confirms the frame was written. Persisting the
//! incident starts only after that and its outcome never changes whether
//! the alert was sent: a failed persist is reported, not retried.
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - EmergencyAlertFlow::trigger() の状態遷移と利用者への通知
//!
//! ### どのような状況を想定しているか
//! - 正常系：位置取得 → 送信 → 記録成功
//! - 異常系：位置取得失敗・タイムアウト、未接続、記録失敗

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, mpsc, oneshot};
use tourwatch_server::{
    domain::{AlertMessage, ContactInfo, DisplayName, EmergencyEvent, Timestamp, UserId},
    infrastructure::dto::websocket::{ClientMessage, EmergencySosPayload},
};
use tourwatch_shared::time::Clock;

use crate::{
    config::ClientConfig,
    formatter::format_distance,
    incident::{IncidentReport, IncidentSink},
    position::{LatestPosition, PositionSource, acquire_position},
    relevance::RelevanceFilter,
};

/// Emergency numbers shown whenever the user has to act on their own
pub const EMERGENCY_CONTACTS: &str = "Police 100, Ambulance 102, Tourist Police 1363";

/// One message for the connection writer.
///
/// The writer answers `sent` after the frame is written to the socket.
/// Dropping it unanswered means the message never left.
#[derive(Debug)]
pub struct OutboundMessage {
    pub message: ClientMessage,
    pub sent: Option<oneshot::Sender<()>>,
}

impl OutboundMessage {
    pub fn new(message: ClientMessage) -> Self {
        Self {
            message,
            sent: None,
        }
    }

    /// A message whose write is reported on the returned receiver
    pub fn confirmed(message: ClientMessage) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                message,
                sent: Some(tx),
            },
            rx,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Idle,
    AcquiringPosition,
    Emitting,
    AwaitingPersistConfirm,
    Done,
    AcquiringPositionFailed,
    EmitFailed,
    PersistFailed,
}

impl AlertState {
    /// Whether nearby users were sent the alert
    pub fn was_broadcast(&self) -> bool {
        matches!(self, AlertState::Done | AlertState::PersistFailed)
    }
}

/// Result of one SOS run
#[derive(Debug, Clone, PartialEq)]
pub struct AlertOutcome {
    /// Terminal state
    pub state: AlertState,
    /// Every state visited, starting with `Idle`
    pub history: Vec<AlertState>,
    /// Messages for the user, in order
    pub notices: Vec<String>,
    /// The event as emitted (absent if no position was obtained)
    pub event: Option<EmergencyEvent>,
    /// Nearby users around the SOS position when it was sent
    pub nearby_count: usize,
}

struct AlertRun {
    history: Vec<AlertState>,
    notices: Vec<String>,
}

impl AlertRun {
    fn new() -> Self {
        Self {
            history: vec![AlertState::Idle],
            notices: Vec::new(),
        }
    }

    fn enter(&mut self, state: AlertState) {
        tracing::debug!("SOS flow: {:?}", state);
        self.history.push(state);
    }

    fn notice(&mut self, text: String) {
        self.notices.push(text);
    }

    fn finish(self, event: Option<EmergencyEvent>, nearby_count: usize) -> AlertOutcome {
        AlertOutcome {
            state: self.history.last().copied().unwrap_or(AlertState::Idle),
            history: self.history,
            notices: self.notices,
            event,
            nearby_count,
        }
    }
}

pub struct EmergencyAlertFlow {
    user_id: UserId,
    display_name: DisplayName,
    contact: ContactInfo,
    position_timeout: Duration,
    position_source: Arc<dyn PositionSource>,
    latest: LatestPosition,
    relevance: Arc<Mutex<RelevanceFilter>>,
    incident_sink: Arc<dyn IncidentSink>,
    /// Writer queue of the current connection
    outbound: mpsc::Sender<OutboundMessage>,
    clock: Arc<dyn Clock>,
}

impl EmergencyAlertFlow {
    pub fn new(
        config: &ClientConfig,
        position_source: Arc<dyn PositionSource>,
        latest: LatestPosition,
        relevance: Arc<Mutex<RelevanceFilter>>,
        incident_sink: Arc<dyn IncidentSink>,
        outbound: mpsc::Sender<OutboundMessage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_id: config.user_id.clone(),
            display_name: config.display_name.clone(),
            contact: config.contact.clone(),
            position_timeout: config.position_timeout,
            position_source,
            latest,
            relevance,
            incident_sink,
            outbound,
            clock,
        }
    }

    /// Run the flow once. Only ever started by the user.
    pub async fn trigger(&self, message: Option<String>) -> AlertOutcome {
        let mut run = AlertRun::new();

        run.enter(AlertState::AcquiringPosition);
        let report =
            match acquire_position(self.position_source.as_ref(), self.position_timeout).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!("SOS aborted, no position: {}", e);
                    run.enter(AlertState::AcquiringPositionFailed);
                    run.notice(format!(
                        "Unable to get your location ({}). SOS was NOT sent. Call emergency services directly: {}",
                        e, EMERGENCY_CONTACTS
                    ));
                    return run.finish(None, 0);
                }
            };
        self.latest.publish(report.clone());

        run.enter(AlertState::Emitting);
        let event = EmergencyEvent {
            source_user_id: self.user_id.clone(),
            source_display_name: self.display_name.clone(),
            position: report.coordinates,
            accuracy: report.accuracy,
            emitted_at: Some(Timestamp::new(self.clock.now_millis())),
            message: self.alert_message(message),
            contact: self.contact.clone(),
        };
        let (nearby_count, radius) = {
            let mut relevance = self.relevance.lock().await;
            (relevance.count_nearby(&event.position), relevance.radius_meters())
        };

        let (outbound, sent) = OutboundMessage::confirmed(ClientMessage::EmergencySos(
            EmergencySosPayload::from(&event),
        ));
        let written = self.outbound.send(outbound).await.is_ok() && sent.await.is_ok();
        if !written {
            tracing::error!("SOS could not be emitted: connection writer is gone");
            run.enter(AlertState::EmitFailed);
            run.notice(format!(
                "Not connected to the alert network. SOS was NOT sent. Call emergency services directly: {}",
                EMERGENCY_CONTACTS
            ));
            return run.finish(Some(event), nearby_count);
        }
        run.notice(format!("SOS sent to {} nearby users!", nearby_count));

        run.enter(AlertState::AwaitingPersistConfirm);
        let sink = self.incident_sink.clone();
        let incident = IncidentReport::for_emergency(&event);
        let persist = tokio::spawn(async move { sink.create_incident(incident).await });

        match persist.await {
            Ok(Ok(record)) => {
                tracing::info!("SOS incident recorded: {:?}", record.id);
                run.enter(AlertState::Done);
                run.notice(format!(
                    "Emergency alert sent! {} users within {} notified. Help is on the way. Stay calm and stay safe.",
                    nearby_count,
                    format_distance(radius)
                ));
            }
            Ok(Err(e)) => {
                tracing::warn!("SOS incident not recorded: {}", e);
                run.enter(AlertState::PersistFailed);
                run.notice(format!(
                    "Alert sent to nearby users, but logging the incident failed. Please call emergency services directly: {}",
                    EMERGENCY_CONTACTS
                ));
            }
            Err(e) => {
                tracing::error!("SOS incident task failed: {}", e);
                run.enter(AlertState::PersistFailed);
                run.notice(format!(
                    "Alert sent to nearby users, but logging the incident failed. Please call emergency services directly: {}",
                    EMERGENCY_CONTACTS
                ));
            }
        }

        run.finish(Some(event), nearby_count)
    }

    fn alert_message(&self, message: Option<String>) -> AlertMessage {
        match message {
            Some(text) => AlertMessage::new(text).unwrap_or_else(|e| {
                tracing::warn!("Using default SOS message: {}", e);
                AlertMessage::for_sender(&self.display_name)
            }),
            None => AlertMessage::for_sender(&self.display_name),
        }
    }
}
