//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの送信キュー（容量付き `mpsc::Sender`）を管理
//! - 送信元以外の全接続へのブロードキャスト（broadcast_except）
//!
//! ## 設計ノート
//!
//! 送信キューの生成は UI 層（`ui::handler::websocket`）で行われます。
//! キューから WebSocket への書き込みは接続ごとのタスクが担当するため、
//! ここでは `try_send` でキューに積むだけで、遅い接続を待つことはありません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::domain::{
    BroadcastReport, ConnectionId, MessagePushError, MessagePusher, PusherChannel,
};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// let (tx, rx) = tokio::sync::mpsc::channel(64);
/// pusher.register_client(connection_id.clone(), tx).await;
///
/// pusher.broadcast_except(&connection_id, "{\"type\":\"sos-alert\",...}").await;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの送信キュー
    ///
    /// Key: connection_id
    /// Value: PusherChannel
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new() -> Self {
        Self::default()
    }
}

fn try_push(
    connection_id: &ConnectionId,
    sender: &PusherChannel,
    content: &str,
) -> Result<(), MessagePushError> {
    sender
        .try_send(content.to_string())
        .map_err(|e| match e {
            TrySendError::Full(_) => MessagePushError::BufferFull(connection_id.to_string()),
            TrySendError::Closed(_) => MessagePushError::ChannelClosed(connection_id.to_string()),
        })
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        clients.insert(connection_id, sender);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(connection_id).is_some() {
            tracing::debug!("Connection '{}' unregistered from MessagePusher", connection_id);
        }
    }

    async fn broadcast_except(&self, exclude: &ConnectionId, content: &str) -> BroadcastReport {
        let clients = self.clients.lock().await;
        let mut report = BroadcastReport::default();

        for (connection_id, sender) in clients.iter().filter(|(id, _)| *id != exclude) {
            // ブロードキャストでは一部の送信失敗を許容（リトライしない）
            match try_push(connection_id, sender, content) {
                Ok(()) => report.delivered.push(connection_id.clone()),
                Err(e) => {
                    tracing::warn!("Skipping connection in broadcast: {}", e);
                    report.dropped.push(connection_id.clone());
                }
            }
        }

        tracing::debug!(
            "Broadcast from '{}': {} delivered, {} dropped",
            exclude,
            report.delivered.len(),
            report.dropped.len()
        );
        report
    }

    async fn connected_ids(&self) -> Vec<ConnectionId> {
        let clients = self.clients.lock().await;
        let mut ids: Vec<ConnectionId> = clients.keys().cloned().collect();
        ids.sort();
        ids
    }
}
