//! UseCase: 接続受付
//!
//! 新しい接続に ConnectionId を割り当て、送信先として登録する。
//! 再接続やセッション再開はなく、新しい接続は常に新しいセッションになる。

use std::sync::Arc;

use tourwatch_shared::time::Clock;

use crate::domain::{ClientSession, ConnectionIdFactory, MessagePusher, PusherChannel, Timestamp};

use super::error::ConnectError;

/// 接続受付のユースケース
pub struct ConnectSessionUseCase {
    /// MessagePusher（接続集合の所有者）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectSessionUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            message_pusher,
            clock,
        }
    }

    /// 接続を受け付ける
    ///
    /// # Returns
    ///
    /// * `Ok(ClientSession)` - ID 未確定のセッション（最初のイベントで確定する）
    /// * `Err(ConnectError)` - ConnectionId の生成に失敗
    pub async fn execute(&self, sender: PusherChannel) -> Result<ClientSession, ConnectError> {
        let connection_id = ConnectionIdFactory::generate()?;
        let connected_at = Timestamp::new(self.clock.now_millis());

        self.message_pusher
            .register_client(connection_id.clone(), sender)
            .await;

        Ok(ClientSession::new(connection_id, connected_at))
    }

    /// 接続中の接続数
    pub async fn online_count(&self) -> usize {
        self.message_pusher.connected_ids().await.len()
    }
}
