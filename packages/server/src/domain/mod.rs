//! Domain layer: value objects, entities and the ports the use cases depend on.

pub mod entity;
pub mod error;
pub mod factory;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{ClientSession, EmergencyEvent, LocationUpdate, PositionReport, PresenceRecord};
pub use error::{MessagePushError, SessionError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use message_pusher::{BroadcastReport, MessagePusher, PusherChannel};
pub use repository::PresenceRepository;
pub use value_object::{
    Accuracy, AlertMessage, ConnectionId, ContactInfo, Coordinates, DEFAULT_RADIUS_METERS,
    DisplayName, Timestamp, UserId,
};
