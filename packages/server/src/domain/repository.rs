//! Repository trait 定義
//!
//! ドメイン層が必要とするプレゼンス（最終位置）データへのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{entity::PresenceRecord, value_object::ConnectionId};

/// Presence Registry trait
///
/// 接続ごとの最終位置を保持する。各操作は単一の置換・削除であり、
/// 並行呼び出しでも部分的に更新されたレコードが観測されることはない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// レコードを丸ごと置き換える（後勝ち）。直前のレコードを返す
    async fn upsert(&self, record: PresenceRecord) -> Option<PresenceRecord>;

    /// レコードを削除する（存在しなければ何もしない）。削除したレコードを返す
    async fn remove(&self, connection_id: &ConnectionId) -> Option<PresenceRecord>;

    /// レコードを取得
    async fn get(&self, connection_id: &ConnectionId) -> Option<PresenceRecord>;

    /// ある時点での全レコードの一貫したスナップショット
    async fn snapshot(&self) -> Vec<PresenceRecord>;

    /// レコード数
    async fn count(&self) -> usize;
}
