//! Client execution logic with reconnection support.

use std::{sync::Arc, time::Duration};

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{Mutex, mpsc};
use tourwatch_shared::time::{Clock, SystemClock};

use crate::{
    config::ClientConfig,
    dedup::NotificationDeduplicator,
    domain::{should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
    incident::{HttpIncidentSink, IncidentSink},
    position::{LatestPosition, ManualPositionSource, spawn_position_producer},
    relevance::RelevanceFilter,
    session::run_client_session,
};

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_INTERVAL_SECS: u64 = 5;
const POSITION_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// State that outlives a single connection
pub struct ClientContext {
    pub config: ClientConfig,
    pub clock: Arc<dyn Clock>,
    pub position_source: Arc<ManualPositionSource>,
    pub latest: LatestPosition,
    pub relevance: Arc<Mutex<RelevanceFilter>>,
    pub dedup: Arc<Mutex<NotificationDeduplicator>>,
    pub incident_sink: Arc<dyn IncidentSink>,
}

impl ClientContext {
    pub fn new(config: ClientConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let incident_sink = Arc::new(HttpIncidentSink::new(
            &config.incident_api,
            config.token.clone(),
        ));
        tracing::info!("Incidents are reported to {}", incident_sink.endpoint());
        let relevance = RelevanceFilter::new(
            config.user_id.clone(),
            config.radius_meters,
            config.nearby_ttl,
            clock.clone(),
        );

        Self {
            position_source: Arc::new(ManualPositionSource::new(clock.clone())),
            latest: LatestPosition::new(),
            relevance: Arc::new(Mutex::new(relevance)),
            dedup: Arc::new(Mutex::new(NotificationDeduplicator::new(clock.clone()))),
            incident_sink,
            clock,
            config,
        }
    }
}

/// Spawn a blocking thread for rustyline (synchronous readline).
///
/// The channel closes on Ctrl+C or Ctrl+D.
fn spawn_readline(prompt_name: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", prompt_name);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}

/// Run the client with reconnection logic
///
/// Every reconnection is a brand-new session on the hub; the nearby set,
/// notification history and last known position carry over locally.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let context = ClientContext::new(config);

    if let Some((lat, lng, accuracy)) = context.config.initial_position {
        let report = context
            .position_source
            .set(lat, lng, accuracy)
            .await
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        context.latest.publish(report);
    }

    let producer = spawn_position_producer(
        context.position_source.clone(),
        context.latest.clone(),
        POSITION_POLL_INTERVAL,
    );
    let mut input_rx = spawn_readline(context.config.display_name.as_str().to_string());
    let mut reconnect_count = 0;

    let result = loop {
        tracing::info!(
            "Connecting to {} as '{}' (attempt {}/{})",
            context.config.url,
            context.config.user_id.as_str(),
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS + 1
        );

        match run_client_session(&context, &mut input_rx).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                break Ok(());
            }
            Err(e) => {
                if should_exit_immediately(&e) {
                    break Err(e);
                }
                tracing::warn!("Connection lost: {}", e);

                if !should_attempt_reconnect(&e, reconnect_count, MAX_RECONNECT_ATTEMPTS) {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    break Err(ClientError::ReconnectExhausted(MAX_RECONNECT_ATTEMPTS));
                }
                reconnect_count += 1;

                tracing::info!(
                    "Reconnecting in {} seconds... (reconnect {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count,
                    MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    };

    producer.abort();
    result
}
