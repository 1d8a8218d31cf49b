//! UseCase: 切断処理
//!
//! 接続集合と Presence Registry の両方から接続を取り除く。
//! 切断は他の接続に通知されない。

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, PresenceRecord, PresenceRepository};

/// 切断処理のユースケース
pub struct DisconnectSessionUseCase {
    repository: Arc<dyn PresenceRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectSessionUseCase {
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 切断を実行（冪等）
    ///
    /// # Returns
    ///
    /// 削除された最終位置（位置を一度も報告していなければ `None`）
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<PresenceRecord> {
        // 先に送信先から外し、以降のブロードキャストが届かないようにする
        self.message_pusher.unregister_client(connection_id).await;
        self.repository.remove(connection_id).await
    }
}
