//! WebSocket connection handlers.
//!
//! 1 接続につき 2 つのタスクを動かす:
//!
//! - 受信タスク: クライアントからのイベントを解釈し、中継ユースケースへ渡す
//! - 送信タスク: 送信キューに積まれたメッセージを WebSocket に書き込む
//!
//! どちらかが終了した時点で接続を閉じ、切断処理を行う。

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::mpsc;

use crate::{
    domain::{ClientSession, EmergencyEvent, Timestamp},
    infrastructure::dto::websocket::{ClientMessage, ConnectedPayload, ServerMessage},
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that drains this connection's outbound queue into the WebSocket.
///
/// Broadcasts from other connections only ever `try_send` into the queue, so a
/// slow socket blocks nobody but itself.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, rx) = mpsc::channel(state.outbound_buffer);
    let mut session = match state.connect_session_usecase.execute(tx).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Failed to accept connection: {}", e);
            return;
        }
    };
    let connection_id = session.connection_id.clone();
    tracing::info!("Connection '{}' opened", connection_id);

    // 接続直後に connected を送る（送信タスク開始前なので必ず最初のフレームになる）
    {
        let greeting = ServerMessage::Connected(ConnectedPayload {
            connection_id: connection_id.to_string(),
            connected_at: session.connected_at.value(),
            online: state.connect_session_usecase.online_count().await,
        });
        let sent = match greeting.to_json() {
            Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
            Err(e) => {
                tracing::error!("Failed to encode greeting: {}", e);
                false
            }
        };
        if !sent {
            state.disconnect_session_usecase.execute(&connection_id).await;
            return;
        }
    }

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(
                        "WebSocket error on '{}': {}",
                        session.connection_id,
                        e
                    );
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_text(&state_clone, &mut session, text.as_str()).await;
                }
                Message::Binary(_) => {
                    tracing::warn!(
                        "Dropping binary frame from '{}'",
                        session.connection_id
                    );
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", session.connection_id);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other and wait for it to
    // stop, so that no relay can upsert this connection after it is removed
    tokio::select! {
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
    };

    match state.disconnect_session_usecase.execute(&connection_id).await {
        Some(record) => tracing::info!(
            "Connection '{}' ({}) closed and removed from registry",
            connection_id,
            record.user_id.as_str()
        ),
        None => tracing::info!("Connection '{}' closed", connection_id),
    }
}

/// Decode one text frame and hand it to the matching relay use case.
///
/// Every failure here drops the event and keeps the connection open.
async fn handle_text(state: &AppState, session: &mut ClientSession, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(
                "Dropping malformed event from '{}': {}",
                session.connection_id,
                e
            );
            return;
        }
    };

    match message {
        ClientMessage::LocationUpdate(payload) => {
            let received_at = Timestamp::new(state.clock.now_millis());
            let update = match payload.into_domain(received_at) {
                Ok(update) => update,
                Err(e) => {
                    tracing::warn!(
                        "Dropping invalid location-update from '{}': {}",
                        session.connection_id,
                        e
                    );
                    return;
                }
            };
            match state.relay_location_usecase.execute(session, update).await {
                Ok(report) if report.is_partial() => tracing::warn!(
                    "user-location from '{}' skipped {} connection(s)",
                    session.connection_id,
                    report.dropped.len()
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    "Dropping location-update from '{}': {}",
                    session.connection_id,
                    e
                ),
            }
        }
        ClientMessage::EmergencySos(payload) => {
            let event = match EmergencyEvent::try_from(payload) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(
                        "Dropping invalid emergency-sos from '{}': {}",
                        session.connection_id,
                        e
                    );
                    return;
                }
            };
            match state.relay_emergency_usecase.execute(session, event).await {
                Ok(relayed) if relayed.report.is_partial() => tracing::warn!(
                    "sos-alert from '{}' skipped {} connection(s)",
                    session.connection_id,
                    relayed.report.dropped.len()
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    "Dropping emergency-sos from '{}': {}",
                    session.connection_id,
                    e
                ),
            }
        }
    }
}
