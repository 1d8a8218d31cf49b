//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{SessionError, ValueObjectError};

/// 接続受付のエラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectError {
    #[error("failed to allocate a connection id: {0}")]
    ConnectionId(#[from] ValueObjectError),
}

/// イベント中継のエラー
///
/// どのエラーもイベントを破棄するだけで、接続は維持される。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelayError {
    #[error(transparent)]
    Identity(#[from] SessionError),

    #[error("failed to encode broadcast: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}
