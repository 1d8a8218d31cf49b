//! Domain errors.

use thiserror::Error;
use tourwatch_shared::geo::GeoError;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueObjectError {
    #[error("connection id must not be empty")]
    EmptyConnectionId,

    #[error("user id must not be empty")]
    EmptyUserId,

    #[error("user id is too long ({0} chars, max {max})", max = super::value_object::UserId::MAX_LEN)]
    UserIdTooLong(usize),

    #[error("display name must not be empty")]
    EmptyDisplayName,

    #[error("display name is too long ({0} chars, max {max})", max = super::value_object::DisplayName::MAX_LEN)]
    DisplayNameTooLong(usize),

    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(#[from] GeoError),

    #[error("accuracy must be a finite, non-negative number of meters: {0}")]
    InvalidAccuracy(f64),

    #[error("alert message is too long ({0} chars, max {max})", max = super::value_object::AlertMessage::MAX_LEN)]
    MessageTooLong(usize),
}

/// Errors raised by a session's identity binding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The connection already spoke as another user
    #[error("connection is bound to user '{bound}' but the event claims '{claimed}'")]
    IdentityMismatch { bound: String, claimed: String },
}

/// Errors raised while pushing messages to connections
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("outbound buffer of connection '{0}' is full")]
    BufferFull(String),

    #[error("connection '{0}' is closed")]
    ChannelClosed(String),
}
