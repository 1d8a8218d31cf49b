//! UseCase: 位置情報の中継
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RelayLocationUseCase::execute() メソッド
//! - Registry の更新とブロードキャスト（送信元以外）
//!
//! ### なぜこのテストが必要か
//! - 位置情報は近くのユーザーを判定する唯一の材料
//! - 別ユーザーを名乗るイベントで他人の位置を書き換えられてはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：Registry 更新と他接続へのブロードキャスト
//! - 異常系：接続に結び付いたユーザーと異なる userId
//! - エッジケース：送信元しか接続していない場合

use std::sync::Arc;

use crate::{
    domain::{
        BroadcastReport, ClientSession, LocationUpdate, MessagePusher, PresenceRecord,
        PresenceRepository,
    },
    infrastructure::dto::websocket::{ServerMessage, UserLocationPayload},
};

use super::error::RelayError;

/// 位置情報中継のユースケース
pub struct RelayLocationUseCase {
    repository: Arc<dyn PresenceRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RelayLocationUseCase {
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// location-update を処理する
    ///
    /// 1. 接続の ID を確定（または照合）
    /// 2. Registry のレコードを丸ごと置き換え
    /// 3. `user-location` を送信元以外の全接続へブロードキャスト
    pub async fn execute(
        &self,
        session: &mut ClientSession,
        update: LocationUpdate,
    ) -> Result<BroadcastReport, RelayError> {
        session.bind_identity(&update.user_id, &update.display_name)?;

        let record = PresenceRecord::from_update(session.connection_id.clone(), update);
        let json = ServerMessage::UserLocation(UserLocationPayload::from(&record)).to_json()?;

        self.repository.upsert(record).await;

        Ok(self
            .message_pusher
            .broadcast_except(&session.connection_id, &json)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ConnectionId, Coordinates, DisplayName, PositionReport, PusherChannel, SessionError,
            Timestamp, UserId,
        },
        infrastructure::repository::InMemoryPresenceRepository,
    };
    use tokio::sync::Mutex;

    // Recording MessagePusher for testing
    #[derive(Default)]
    struct MockMessagePusher {
        broadcasts: Mutex<Vec<(ConnectionId, String)>>,
    }

    #[async_trait::async_trait]
    impl MessagePusher for MockMessagePusher {
        async fn register_client(&self, _connection_id: ConnectionId, _sender: PusherChannel) {}

        async fn unregister_client(&self, _connection_id: &ConnectionId) {}

        async fn broadcast_except(&self, exclude: &ConnectionId, content: &str) -> BroadcastReport {
            self.broadcasts
                .lock()
                .await
                .push((exclude.clone(), content.to_string()));
            BroadcastReport::default()
        }

        async fn connected_ids(&self) -> Vec<ConnectionId> {
            Vec::new()
        }
    }

    fn session(connection: &str) -> ClientSession {
        ClientSession::new(
            ConnectionId::new(connection.to_string()).unwrap(),
            Timestamp::new(0),
        )
    }

    fn update(user: &str, lat: f64, lng: f64) -> LocationUpdate {
        LocationUpdate {
            user_id: UserId::new(user.to_string()).unwrap(),
            display_name: DisplayName::new(user.to_uppercase()).unwrap(),
            position: PositionReport::new(
                Coordinates::new(lat, lng).unwrap(),
                None,
                Timestamp::new(1000),
            ),
        }
    }

    #[tokio::test]
    async fn test_relay_location_updates_registry_and_broadcasts() {
        // テスト項目: 位置情報が Registry に保存され、送信元以外へ user-location が配信される
        // given (前提条件):
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let pusher = Arc::new(MockMessagePusher::default());
        let usecase = RelayLocationUseCase::new(repository.clone(), pusher.clone());
        let mut session = session("c1");

        // when (操作):
        let result = usecase
            .execute(&mut session, update("alice", 31.2526, 75.7044))
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        let stored = repository.get(&session.connection_id).await.unwrap();
        assert_eq!(stored.user_id.as_str(), "alice");

        let broadcasts = pusher.broadcasts.lock().await;
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].0, session.connection_id);
        let value: serde_json::Value = serde_json::from_str(&broadcasts[0].1).unwrap();
        assert_eq!(value["type"], "user-location");
        assert_eq!(value["userId"], "alice");
        assert_eq!(value["lat"], 31.2526);
    }

    #[tokio::test]
    async fn test_relay_location_overwrites_previous_position() {
        // テスト項目: 2 回目の位置情報は前回の位置を置き換える
        // given (前提条件):
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let pusher = Arc::new(MockMessagePusher::default());
        let usecase = RelayLocationUseCase::new(repository.clone(), pusher);
        let mut session = session("c1");
        usecase
            .execute(&mut session, update("alice", 31.0, 75.0))
            .await
            .unwrap();

        // when (操作):
        usecase
            .execute(&mut session, update("alice", 32.0, 76.0))
            .await
            .unwrap();

        // then (期待する結果):
        let snapshot = repository.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].position.coordinates.lat(), 32.0);
    }

    #[tokio::test]
    async fn test_relay_location_rejects_identity_change() {
        // テスト項目: 接続に結び付いたユーザー以外を名乗る位置情報は破棄される
        // given (前提条件):
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let pusher = Arc::new(MockMessagePusher::default());
        let usecase = RelayLocationUseCase::new(repository.clone(), pusher.clone());
        let mut session = session("c1");
        usecase
            .execute(&mut session, update("alice", 31.0, 75.0))
            .await
            .unwrap();

        // when (操作):
        let result = usecase
            .execute(&mut session, update("mallory", 10.0, 10.0))
            .await;

        // then (期待する結果): Registry は更新されず、ブロードキャストもされない
        assert!(matches!(
            result,
            Err(RelayError::Identity(SessionError::IdentityMismatch { .. }))
        ));
        let stored = repository.get(&session.connection_id).await.unwrap();
        assert_eq!(stored.position.coordinates.lat(), 31.0);
        assert_eq!(pusher.broadcasts.lock().await.len(), 1);
    }
}
