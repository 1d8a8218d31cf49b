//! WebSocket client session management.
//!
//! One session is one connection to the hub. Three things run concurrently:
//!
//! - read task: frames from the hub go through the relevance filter
//! - write task: SOS events from the alert flow and position changes
//! - the prompt loop: commands typed by the user

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tourwatch_server::{
    domain::{LocationUpdate, PositionReport},
    infrastructure::dto::websocket::{ClientMessage, LocationUpdatePayload},
};

use crate::{
    alert_flow::{EmergencyAlertFlow, OutboundMessage},
    domain::{Command, HELP_TEXT, parse_command},
    error::ClientError,
    formatter::MessageFormatter,
    inbound::{InboundEvent, InboundHandler},
    relevance::Relevance,
    runner::ClientContext,
};

use super::ui::{print_and_prompt, redisplay_prompt};

/// Capacity of the per-session writer queue
const OUTBOUND_BUFFER: usize = 32;

/// Run one session until the user quits (`Ok`) or the connection is lost (`Err`)
pub async fn run_client_session(
    context: &ClientContext,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let config = &context.config;
    let (ws_stream, _response) = connect_async(config.url.as_str())
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to {}", config.url);
    let user_name = config.display_name.as_str().to_string();
    println!(
        "\nYou are '{}'. Type /help for commands. Press Ctrl+C to exit.\n",
        user_name
    );

    let (mut write, mut read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_BUFFER);

    // Spawn a task to handle incoming messages
    let inbound = InboundHandler::new(
        context.relevance.clone(),
        context.dedup.clone(),
        context.latest.clone(),
    );
    let user_name_for_read = user_name.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let event = inbound.handle_text(text.as_str()).await;
                    render_inbound(&event, &user_name_for_read);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to write SOS events and position changes
    let mut position_rx = context.latest.subscribe();
    let user_id = config.user_id.clone();
    let display_name = config.display_name.clone();
    let mut write_task = tokio::spawn(async move {
        let location = |report: PositionReport| {
            OutboundMessage::new(ClientMessage::LocationUpdate(LocationUpdatePayload::from(
                &LocationUpdate {
                    user_id: user_id.clone(),
                    display_name: display_name.clone(),
                    position: report,
                },
            )))
        };

        // Every new session starts by announcing the last known position
        let mut pending = position_rx.borrow_and_update().clone().map(&location);

        loop {
            let OutboundMessage { message, sent } = match pending.take() {
                Some(message) => message,
                None => tokio::select! {
                    Some(message) = outbound_rx.recv() => message,
                    changed = position_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        match position_rx.borrow_and_update().clone() {
                            Some(report) => location(report),
                            None => continue,
                        }
                    }
                },
            };

            let json = match message.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Text(json.into())).await {
                tracing::warn!("Failed to send message: {}", e);
                break;
            }
            if let Some(sent) = sent {
                let _ = sent.send(());
            }
        }
    });

    redisplay_prompt(&user_name);

    loop {
        tokio::select! {
            _ = &mut read_task => {
                write_task.abort();
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
            _ = &mut write_task => {
                read_task.abort();
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
            line = input_rx.recv() => {
                let Some(line) = line else {
                    // stdin closed (Ctrl+C / Ctrl+D)
                    read_task.abort();
                    write_task.abort();
                    return Ok(());
                };
                if !handle_command(context, &line, &outbound_tx, &user_name).await {
                    read_task.abort();
                    write_task.abort();
                    return Ok(());
                }
            }
        }
    }
}

/// Execute one prompt line. Returns `false` when the user wants to quit.
async fn handle_command(
    context: &ClientContext,
    line: &str,
    outbound_tx: &mpsc::Sender<OutboundMessage>,
    user_name: &str,
) -> bool {
    match parse_command(line) {
        Ok(Command::Quit) => return false,
        Ok(Command::Move { lat, lng, accuracy }) => {
            match context.position_source.set(lat, lng, accuracy).await {
                Ok(report) => {
                    context.latest.publish(report);
                    print_and_prompt(
                        &MessageFormatter::format_notice(&format!(
                            "Position set to {}, {}",
                            lat, lng
                        )),
                        user_name,
                    );
                }
                Err(e) => print_and_prompt(
                    &MessageFormatter::format_notice(&format!("Invalid position: {}", e)),
                    user_name,
                ),
            }
        }
        Ok(Command::Sos { message }) => {
            let flow = EmergencyAlertFlow::new(
                &context.config,
                context.position_source.clone(),
                context.latest.clone(),
                context.relevance.clone(),
                context.incident_sink.clone(),
                outbound_tx.clone(),
                context.clock.clone(),
            );
            print_and_prompt(
                &MessageFormatter::format_notice("Raising SOS, getting your location..."),
                user_name,
            );
            let user_name = user_name.to_string();
            // Position acquisition must not hold up the prompt or incoming alerts
            tokio::spawn(async move {
                let outcome = flow.trigger(message).await;
                for notice in &outcome.notices {
                    print!("{}", MessageFormatter::format_notice(notice));
                }
                redisplay_prompt(&user_name);
            });
        }
        Ok(Command::Nearby) => {
            let own = context.latest.coordinates();
            let (users, radius) = {
                let mut relevance = context.relevance.lock().await;
                (relevance.nearby_users(own.as_ref()), relevance.radius_meters())
            };
            if own.is_none() {
                print!(
                    "{}",
                    MessageFormatter::format_notice(
                        "Your position is unknown; set it with /move <lat> <lng>"
                    )
                );
            }
            print_and_prompt(&MessageFormatter::format_nearby(&users, radius), user_name);
        }
        Ok(Command::Help) => print_and_prompt(&format!("\n{}\n", HELP_TEXT), user_name),
        Err(message) => print_and_prompt(&MessageFormatter::format_notice(&message), user_name),
    }
    true
}

fn render_inbound(event: &InboundEvent, user_name: &str) {
    match event {
        InboundEvent::Connected {
            connection_id,
            online,
        } => print_and_prompt(
            &MessageFormatter::format_connected(connection_id, *online, user_name),
            user_name,
        ),
        InboundEvent::Alert(alert) => {
            // Terminal bell as the audible cue
            print!("\x07");
            print_and_prompt(
                &MessageFormatter::format_sos_alert(&alert.event, alert.distance_meters, &alert.own),
                user_name,
            );
        }
        InboundEvent::Presence {
            user_id,
            relevance: Relevance::Relevant { distance_meters },
        } => {
            tracing::debug!("{} is nearby ({:.0}m)", user_id.as_str(), distance_meters);
        }
        InboundEvent::Presence { .. }
        | InboundEvent::AlertSuppressed { .. }
        | InboundEvent::DuplicateAlert
        | InboundEvent::Dropped => {}
    }
}
