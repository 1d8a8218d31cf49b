//! Entities and domain events.

use super::{
    error::SessionError,
    value_object::{
        Accuracy, AlertMessage, ConnectionId, ContactInfo, Coordinates, DisplayName, Timestamp,
        UserId,
    },
};

/// Most recent position fix of a user.
///
/// A new report replaces the previous one; reports are never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    pub coordinates: Coordinates,
    /// Display only; never used for filtering decisions
    pub accuracy: Option<Accuracy>,
    pub timestamp: Timestamp,
}

impl PositionReport {
    pub fn new(coordinates: Coordinates, accuracy: Option<Accuracy>, timestamp: Timestamp) -> Self {
        Self {
            coordinates,
            accuracy,
            timestamp,
        }
    }
}

/// A `location-update` after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub position: PositionReport,
}

/// Presence registry entry: last-known identity and position of one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceRecord {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub position: PositionReport,
}

impl PresenceRecord {
    pub fn from_update(connection_id: ConnectionId, update: LocationUpdate) -> Self {
        Self {
            connection_id,
            user_id: update.user_id,
            display_name: update.display_name,
            position: update.position,
        }
    }
}

/// An "I need help" broadcast.
///
/// Not stored by the hub; persistence goes through the client's incident sink.
#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyEvent {
    pub source_user_id: UserId,
    pub source_display_name: DisplayName,
    pub position: Coordinates,
    pub accuracy: Option<Accuracy>,
    /// Set by the emitter, or by the hub on receipt when absent
    pub emitted_at: Option<Timestamp>,
    pub message: AlertMessage,
    pub contact: ContactInfo,
}

impl EmergencyEvent {
    /// Fill in `emitted_at` if the sender left it empty. Returns the effective time.
    pub fn stamp(&mut self, now: Timestamp) -> Timestamp {
        *self.emitted_at.get_or_insert(now)
    }
}

/// One live real-time connection.
///
/// Identity is empty until the first valid event arrives, after which the
/// connection may only speak for that user.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSession {
    pub connection_id: ConnectionId,
    pub connected_at: Timestamp,
    identity: Option<(UserId, DisplayName)>,
}

impl ClientSession {
    pub fn new(connection_id: ConnectionId, connected_at: Timestamp) -> Self {
        Self {
            connection_id,
            connected_at,
            identity: None,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.identity.as_ref().map(|(id, _)| id)
    }

    pub fn display_name(&self) -> Option<&DisplayName> {
        self.identity.as_ref().map(|(_, name)| name)
    }

    /// Bind the identity on first use, or check it against the bound one.
    ///
    /// The display name may change between events; the user id may not.
    pub fn bind_identity(
        &mut self,
        user_id: &UserId,
        display_name: &DisplayName,
    ) -> Result<(), SessionError> {
        match self.identity.as_mut() {
            None => {}
            Some((bound, _)) if *bound != *user_id => {
                return Err(SessionError::IdentityMismatch {
                    bound: bound.as_str().to_string(),
                    claimed: user_id.as_str().to_string(),
                });
            }
            Some((_, name)) => {
                *name = display_name.clone();
                return Ok(());
            }
        }
        self.identity = Some((user_id.clone(), display_name.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn name(value: &str) -> DisplayName {
        DisplayName::new(value.to_string()).unwrap()
    }

    fn session() -> ClientSession {
        ClientSession::new(
            ConnectionId::new("conn-1".to_string()).unwrap(),
            Timestamp::new(1000),
        )
    }

    #[test]
    fn test_new_session_has_no_identity() {
        // テスト項目: 接続直後のセッションは ID を持たない
        // given (前提条件):

        // when (操作):
        let session = session();

        // then (期待する結果):
        assert!(session.user_id().is_none());
        assert!(session.display_name().is_none());
    }

    #[test]
    fn test_bind_identity_on_first_event() {
        // テスト項目: 最初のイベントでセッションに ID が結び付けられる
        // given (前提条件):
        let mut session = session();

        // when (操作):
        let result = session.bind_identity(&user("alice"), &name("Alice"));

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(session.user_id(), Some(&user("alice")));
        assert_eq!(session.display_name(), Some(&name("Alice")));
    }

    #[test]
    fn test_bind_identity_allows_rename() {
        // テスト項目: 同じユーザーであれば表示名の変更は許可される
        // given (前提条件):
        let mut session = session();
        session.bind_identity(&user("alice"), &name("Alice")).unwrap();

        // when (操作):
        let result = session.bind_identity(&user("alice"), &name("Alice K"));

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(session.display_name(), Some(&name("Alice K")));
    }

    #[test]
    fn test_bind_identity_rejects_other_user() {
        // テスト項目: 別ユーザーを名乗るイベントは IdentityMismatch になる
        // given (前提条件):
        let mut session = session();
        session.bind_identity(&user("alice"), &name("Alice")).unwrap();

        // when (操作):
        let result = session.bind_identity(&user("mallory"), &name("Alice"));

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SessionError::IdentityMismatch {
                bound: "alice".to_string(),
                claimed: "mallory".to_string(),
            })
        );
        assert_eq!(session.user_id(), Some(&user("alice")));
    }

    #[test]
    fn test_stamp_keeps_sender_timestamp() {
        // テスト項目: 送信者が設定した emitted_at は上書きされない
        // given (前提条件):
        let mut event = EmergencyEvent {
            source_user_id: user("alice"),
            source_display_name: name("Alice"),
            position: Coordinates::new(31.2526, 75.7044).unwrap(),
            accuracy: None,
            emitted_at: Some(Timestamp::new(500)),
            message: AlertMessage::new(String::new()).unwrap(),
            contact: ContactInfo::default(),
        };

        // when (操作):
        let effective = event.stamp(Timestamp::new(900));

        // then (期待する結果):
        assert_eq!(effective, Timestamp::new(500));
        assert_eq!(event.emitted_at, Some(Timestamp::new(500)));
    }

    #[test]
    fn test_stamp_fills_missing_timestamp() {
        // テスト項目: emitted_at が未設定の場合は受信時刻が設定される
        // given (前提条件):
        let mut event = EmergencyEvent {
            source_user_id: user("alice"),
            source_display_name: name("Alice"),
            position: Coordinates::new(31.2526, 75.7044).unwrap(),
            accuracy: None,
            emitted_at: None,
            message: AlertMessage::new(String::new()).unwrap(),
            contact: ContactInfo::default(),
        };

        // when (操作):
        let effective = event.stamp(Timestamp::new(900));

        // then (期待する結果):
        assert_eq!(effective, Timestamp::new(900));
        assert_eq!(event.emitted_at, Some(Timestamp::new(900)));
    }
}
