//! Value objects.
//!
//! Every type validates on construction, so an entity built from them is
//! valid by definition. Wire payloads are converted into these types at the
//! hub boundary (see `infrastructure::dto::conversion`).

use tourwatch_shared::geo::{self, GeoPoint};

use super::error::ValueObjectError;

/// Opaque identifier of one real-time connection, unique for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyConnectionId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable user identity as reported by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub const MAX_LEN: usize = 128;

    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(ValueObjectError::EmptyUserId);
        }
        let len = value.chars().count();
        if len > Self::MAX_LEN {
            return Err(ValueObjectError::UserIdTooLong(len));
        }
        Ok(Self(value))
    }

    /// Like [`UserId::new`], but an over-long id is cut to [`UserId::MAX_LEN`]
    /// characters instead of rejected.
    pub fn truncated(value: String) -> Result<Self, ValueObjectError> {
        Self::new(value.trim().chars().take(Self::MAX_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Human-readable name shown to other users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub const MAX_LEN: usize = 100;

    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(ValueObjectError::EmptyDisplayName);
        }
        let len = value.chars().count();
        if len > Self::MAX_LEN {
            return Err(ValueObjectError::DisplayNameTooLong(len));
        }
        Ok(Self(value))
    }

    pub const DEFAULT: &'static str = "Tourist";

    /// Parse a display name, falling back to "Tourist" when it is blank.
    pub fn or_default(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Ok(Self(Self::DEFAULT.to_string()));
        }
        Self::new(value)
    }

    /// Like [`DisplayName::or_default`], but an over-long name also becomes "Tourist".
    pub fn or_fallback(value: String) -> Self {
        Self::or_default(value).unwrap_or_else(|_| Self(Self::DEFAULT.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates(GeoPoint);

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValueObjectError> {
        Ok(Self(GeoPoint::new(lat, lng)?))
    }

    pub fn lat(&self) -> f64 {
        self.0.lat()
    }

    pub fn lng(&self) -> f64 {
        self.0.lng()
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        self.0.distance_to(&other.0)
    }

    /// `true` when `other` lies strictly inside `radius_meters`.
    pub fn is_within(&self, other: &Coordinates, radius_meters: f64) -> bool {
        self.distance_to(other) < radius_meters
    }
}

/// Estimated error radius of a position fix, in meters. Display only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accuracy(f64);

impl Accuracy {
    pub fn new(meters: f64) -> Result<Self, ValueObjectError> {
        if !meters.is_finite() || meters < 0.0 {
            return Err(ValueObjectError::InvalidAccuracy(meters));
        }
        Ok(Self(meters))
    }

    pub fn meters(&self) -> f64 {
        self.0
    }
}

/// Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Text carried by an SOS event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage(String);

impl AlertMessage {
    pub const MAX_LEN: usize = 500;
    pub const DEFAULT: &'static str = "EMERGENCY! Someone needs help nearby!";

    /// Blank text is replaced with [`AlertMessage::DEFAULT`].
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let value = value.trim().to_string();
        if value.is_empty() {
            return Ok(Self(Self::DEFAULT.to_string()));
        }
        let len = value.chars().count();
        if len > Self::MAX_LEN {
            return Err(ValueObjectError::MessageTooLong(len));
        }
        Ok(Self(value))
    }

    /// Like [`AlertMessage::new`], but over-long text is replaced with
    /// [`AlertMessage::DEFAULT`] instead of rejected.
    pub fn or_default(value: String) -> Self {
        Self::new(value).unwrap_or_else(|_| Self(Self::DEFAULT.to_string()))
    }

    /// The message a client sends when the user gives none.
    pub fn for_sender(display_name: &DisplayName) -> Self {
        Self(format!(
            "{} is in emergency and needs immediate help!",
            display_name.as_str()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Optional out-of-band contact details attached to an SOS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactInfo {
    /// Blank strings are treated as absent.
    pub fn new(email: Option<String>, phone: Option<String>) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            email: clean(email),
            phone: clean(phone),
        }
    }
}

/// Default relevance radius, re-exported for callers that only see the domain.
pub const DEFAULT_RADIUS_METERS: f64 = geo::DEFAULT_RADIUS_METERS;
