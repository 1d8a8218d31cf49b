//! UseCase layer: one struct per hub operation.
//!
//! Together these make up the connection hub: the connection set lives in
//! the `MessagePusher`, last-known positions in the `PresenceRepository`, and
//! only these use cases write to either.

mod connect_session;
mod disconnect_session;
mod error;
mod get_presence;
mod relay_emergency;
mod relay_location;

pub use connect_session::ConnectSessionUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::{ConnectError, RelayError};
pub use get_presence::{GetPresenceUseCase, NearbyPresence};
pub use relay_emergency::{RelayEmergencyUseCase, RelayedEmergency};
pub use relay_location::RelayLocationUseCase;
