//! UseCase: SOS の中継
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RelayEmergencyUseCase::execute() メソッド
//! - 受信時刻の補完と、送信元以外へのブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - SOS は近くの人へ確実に（ベストエフォートで）即時に届く必要がある
//! - Registry を変更してはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：送信元以外の全接続への配信
//! - エッジケース：timestamp 無しの SOS、送信元しかいない場合

use std::sync::Arc;

use tourwatch_shared::time::Clock;

use crate::{
    domain::{BroadcastReport, ClientSession, EmergencyEvent, MessagePusher, Timestamp},
    infrastructure::dto::websocket::{ServerMessage, SosAlertPayload},
};

use super::error::RelayError;

/// Result of a relayed SOS
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedEmergency {
    /// The event as broadcast, `emitted_at` always set
    pub event: EmergencyEvent,
    pub report: BroadcastReport,
}

/// SOS 中継のユースケース
pub struct RelayEmergencyUseCase {
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl RelayEmergencyUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            message_pusher,
            clock,
        }
    }

    /// emergency-sos を処理する
    ///
    /// 送信元への確認応答は「ブロードキャストを受け付けた」以上のものはない。
    pub async fn execute(
        &self,
        session: &mut ClientSession,
        mut event: EmergencyEvent,
    ) -> Result<RelayedEmergency, RelayError> {
        session.bind_identity(&event.source_user_id, &event.source_display_name)?;
        event.stamp(Timestamp::new(self.clock.now_millis()));

        let json = ServerMessage::SosAlert(SosAlertPayload::from(&event)).to_json()?;
        let report = self
            .message_pusher
            .broadcast_except(&session.connection_id, &json)
            .await;

        tracing::info!(
            "SOS from '{}' relayed to {} connection(s)",
            event.source_user_id.as_str(),
            report.delivered.len()
        );

        Ok(RelayedEmergency { event, report })
    }
}
