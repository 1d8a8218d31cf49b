//! Shared application state.

use std::sync::Arc;

use tourwatch_shared::time::Clock;

use crate::usecase::{
    ConnectSessionUseCase, DisconnectSessionUseCase, GetPresenceUseCase, RelayEmergencyUseCase,
    RelayLocationUseCase,
};

/// Shared application state
pub struct AppState {
    /// ConnectSessionUseCase（接続受付のユースケース）
    pub connect_session_usecase: Arc<ConnectSessionUseCase>,
    /// DisconnectSessionUseCase（切断のユースケース）
    pub disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    /// RelayLocationUseCase（位置情報中継のユースケース）
    pub relay_location_usecase: Arc<RelayLocationUseCase>,
    /// RelayEmergencyUseCase（SOS 中継のユースケース）
    pub relay_emergency_usecase: Arc<RelayEmergencyUseCase>,
    /// GetPresenceUseCase（プレゼンス照会のユースケース）
    pub get_presence_usecase: Arc<GetPresenceUseCase>,
    /// 受信時刻の付与に使う時計
    pub clock: Arc<dyn Clock>,
    /// 接続ごとの送信キュー容量
    pub outbound_buffer: usize,
}
