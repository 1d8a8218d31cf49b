//! Identifier factories.

use uuid::Uuid;

use super::{error::ValueObjectError, value_object::ConnectionId};

/// Generates a fresh [`ConnectionId`] for each accepted connection.
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    pub fn generate() -> Result<ConnectionId, ValueObjectError> {
        ConnectionId::new(Uuid::new_v4().to_string())
    }
}
