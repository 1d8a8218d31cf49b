//! InMemory Presence Repository 実装
//!
//! ドメイン層が定義する PresenceRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! プロセス起動時は空で、終了時に破棄されます（永続化しない）。
//! レコードは常に丸ごと置き換えるため、スナップショットに
//! 更新途中のレコードが現れることはありません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ConnectionId, PresenceRecord, PresenceRepository};

/// インメモリ Presence Repository 実装
#[derive(Default)]
pub struct InMemoryPresenceRepository {
    /// Key: connection_id, Value: 最終位置
    records: RwLock<HashMap<ConnectionId, PresenceRecord>>,
}

impl InMemoryPresenceRepository {
    /// 空の InMemoryPresenceRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceRepository for InMemoryPresenceRepository {
    async fn upsert(&self, record: PresenceRecord) -> Option<PresenceRecord> {
        let mut records = self.records.write().await;
        records.insert(record.connection_id.clone(), record)
    }

    async fn remove(&self, connection_id: &ConnectionId) -> Option<PresenceRecord> {
        let mut records = self.records.write().await;
        records.remove(connection_id)
    }

    async fn get(&self, connection_id: &ConnectionId) -> Option<PresenceRecord> {
        let records = self.records.read().await;
        records.get(connection_id).cloned()
    }

    async fn snapshot(&self) -> Vec<PresenceRecord> {
        let records = self.records.read().await;
        let mut snapshot: Vec<PresenceRecord> = records.values().cloned().collect();
        snapshot.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        snapshot
    }

    async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{Coordinates, DisplayName, PositionReport, Timestamp, UserId};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemoryPresenceRepository の upsert / remove / get / snapshot
    // - 並行 upsert でレコードが失われたり壊れたりしないこと
    //
    // 【なぜこのテストが必要か】
    // - Presence Registry は全接続ハンドラから並行に更新される共有状態
    // - 切断後にレコードが残ると、存在しないユーザーが近くにいるように見える
    //
    // 【どのようなシナリオをテストするか】
    // 1. upsert は既存レコードを丸ごと置き換える
    // 2. remove は冪等
    // 3. snapshot は全レコードを返す
    // 4. 1,000 接続からの並行 upsert
    // ========================================

    fn record(connection: &str, lat: f64, lng: f64) -> PresenceRecord {
        PresenceRecord {
            connection_id: ConnectionId::new(connection.to_string()).unwrap(),
            user_id: UserId::new(format!("user-{}", connection)).unwrap(),
            display_name: DisplayName::new(format!("User {}", connection)).unwrap(),
            position: PositionReport::new(
                Coordinates::new(lat, lng).unwrap(),
                None,
                Timestamp::new(1000),
            ),
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_replaces() {
        // テスト項目: upsert は新規追加し、2 回目は直前のレコードを返して置き換える
        // given (前提条件):
        let repo = InMemoryPresenceRepository::new();
        let first = record("c1", 31.0, 75.0);
        let second = record("c1", 32.0, 76.0);

        // when (操作):
        let previous1 = repo.upsert(first.clone()).await;
        let previous2 = repo.upsert(second.clone()).await;

        // then (期待する結果):
        assert_eq!(previous1, None);
        assert_eq!(previous2, Some(first));
        assert_eq!(repo.get(&second.connection_id).await, Some(second));
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        // テスト項目: 存在しないレコードの削除は何もしない（冪等性）
        // given (前提条件):
        let repo = InMemoryPresenceRepository::new();
        let rec = record("c1", 31.0, 75.0);
        repo.upsert(rec.clone()).await;

        // when (操作):
        let removed = repo.remove(&rec.connection_id).await;
        let removed_again = repo.remove(&rec.connection_id).await;

        // then (期待する結果):
        assert_eq!(removed, Some(rec));
        assert_eq!(removed_again, None);
        assert!(repo.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_returns_all_records_sorted() {
        // テスト項目: snapshot は全レコードを connection_id 順で返す
        // given (前提条件):
        let repo = InMemoryPresenceRepository::new();
        repo.upsert(record("c2", 31.0, 75.0)).await;
        repo.upsert(record("c1", 31.1, 75.1)).await;

        // when (操作):
        let snapshot = repo.snapshot().await;

        // then (期待する結果):
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].connection_id.as_str(), "c1");
        assert_eq!(snapshot[1].connection_id.as_str(), "c2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_for_1000_connections() {
        // テスト項目: 1,000 接続からの並行 upsert で最終位置が失われない
        // given (前提条件):
        let repo = Arc::new(InMemoryPresenceRepository::new());

        // when (操作): 各接続が 3 回ずつ位置を更新する
        let mut handles = Vec::new();
        for i in 0..1000 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let connection = format!("c{:04}", i);
                for step in 0..3 {
                    let lat = (i as f64) * 0.01 - 5.0;
                    let lng = step as f64;
                    repo.upsert(record(&connection, lat, lng)).await;
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // then (期待する結果): 全接続の最終位置が最後に送った値と一致する
        let snapshot = repo.snapshot().await;
        assert_eq!(snapshot.len(), 1000);
        for (i, rec) in snapshot.iter().enumerate() {
            assert_eq!(rec.connection_id.as_str(), format!("c{:04}", i));
            assert_eq!(rec.position.coordinates.lat(), (i as f64) * 0.01 - 5.0);
            assert_eq!(rec.position.coordinates.lng(), 2.0);
        }
    }
}
