//! WebSocket event DTOs.
//!
//! Every frame is a JSON object tagged by `type`. Anything that does not
//! parse into one of these variants is dropped at the hub boundary.
//!
//! ```text
//! client -> server   location-update, emergency-sos
//! server -> client   connected, user-location, sos-alert
//! ```

use serde::{Deserialize, Serialize};

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    LocationUpdate(LocationUpdatePayload),
    EmergencySos(EmergencySosPayload),
}

/// Events sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Connected(ConnectedPayload),
    UserLocation(UserLocationPayload),
    SosAlert(SosAlertPayload),
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdatePayload {
    pub user_id: String,
    pub user_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencySosPayload {
    pub user_id: String,
    pub user_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Emission time; the server fills in receipt time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_phone: Option<String>,
}

/// Greeting sent to a connection right after the upgrade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub connection_id: String,
    pub connected_at: i64,
    /// Open connections, this one included
    pub online: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocationPayload {
    pub user_id: String,
    pub user_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: i64,
}

/// Same fields as [`EmergencySosPayload`], with the timestamp always set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosAlertPayload {
    pub user_id: String,
    pub user_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location_update_from_browser_payload() {
        // テスト項目: ブラウザ版と同じ形式の location-update を解析できる
        // given (前提条件):
        let json = r#"{"type":"location-update","userId":"u1","userName":"Asha","lat":31.25,"lng":75.7}"#;

        // when (操作):
        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(
            msg,
            ClientMessage::LocationUpdate(LocationUpdatePayload {
                user_id: "u1".to_string(),
                user_name: "Asha".to_string(),
                lat: 31.25,
                lng: 75.7,
                accuracy: None,
                timestamp: None,
            })
        );
    }

    #[test]
    fn test_parse_emergency_sos_with_optional_fields() {
        // テスト項目: 任意項目付きの emergency-sos を解析できる
        // given (前提条件):
        let json = r#"{
            "type": "emergency-sos",
            "userId": "u1",
            "userName": "Asha",
            "lat": 31.2526,
            "lng": 75.7044,
            "accuracy": 12.0,
            "timestamp": 1700000000000,
            "message": "help",
            "userEmail": "asha@example.com",
            "userPhone": "+91 98765 43210"
        }"#;

        // when (操作):
        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        let ClientMessage::EmergencySos(sos) = msg else {
            panic!("expected emergency-sos");
        };
        assert_eq!(sos.accuracy, Some(12.0));
        assert_eq!(sos.timestamp, Some(1_700_000_000_000));
        assert_eq!(sos.user_phone.as_deref(), Some("+91 98765 43210"));
    }

    #[test]
    fn test_missing_coordinates_fail_to_parse() {
        // テスト項目: 座標が欠けたイベントは解析エラーになる
        // given (前提条件):
        let json = r#"{"type":"emergency-sos","userId":"u1","userName":"Asha","lat":31.25}"#;

        // when (操作):
        let result = serde_json::from_str::<ClientMessage>(json);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_type_fails_to_parse() {
        // テスト項目: 未知の type を持つイベントは解析エラーになる
        // given (前提条件):
        let json = r#"{"type":"chat","userId":"u1","content":"hi"}"#;

        // when (操作):
        let result = serde_json::from_str::<ClientMessage>(json);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_sos_alert_serializes_with_tag_and_camel_case() {
        // テスト項目: sos-alert が type タグと camelCase のキーで出力される
        // given (前提条件):
        let msg = ServerMessage::SosAlert(SosAlertPayload {
            user_id: "u1".to_string(),
            user_name: "Asha".to_string(),
            lat: 31.2526,
            lng: 75.7044,
            accuracy: None,
            timestamp: 1000,
            message: "help".to_string(),
            user_email: None,
            user_phone: None,
        });

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "sos-alert");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["userName"], "Asha");
        assert_eq!(value["timestamp"], 1000);
        assert!(value.get("accuracy").is_none());
        assert!(value.get("userPhone").is_none());
    }
}
