//! MessagePusher trait 定義
//!
//! 接続中のクライアントへメッセージを届けるためのインターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 配信ポリシー
//!
//! 各接続は容量付きの送信キューを持ちます。ブロードキャストは決して
//! 待機せず、キューが満杯の接続はそのブロードキャストから外されます。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::value_object::ConnectionId;

/// Bounded outbound queue of one connection
pub type PusherChannel = mpsc::Sender<String>;

/// Outcome of one fan-out.
///
/// Partial delivery is expected and is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections whose queue accepted the message
    pub delivered: Vec<ConnectionId>,
    /// Connections skipped because their queue was full or closed
    pub dropped: Vec<ConnectionId>,
}

impl BroadcastReport {
    pub fn is_partial(&self) -> bool {
        !self.dropped.is_empty()
    }
}

/// Message Pusher trait
///
/// 接続集合（アクティブな接続の送信キュー）の唯一の所有者。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を送信先として登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続を送信先から削除（存在しなければ何もしない）
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 指定した接続以外の全ての接続にブロードキャスト（ブロックしない）
    async fn broadcast_except(&self, exclude: &ConnectionId, content: &str) -> BroadcastReport;

    /// 接続中の全ての ConnectionId を取得
    async fn connected_ids(&self) -> Vec<ConnectionId>;
}
