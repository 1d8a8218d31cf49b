//! Great-circle distance on a spherical Earth.
//!
//! The server (nearby queries) and the client (relevance filter) both call
//! [`distance_meters`], so the two sides cannot disagree on a distance.

use thiserror::Error;

/// Mean Earth radius in meters used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default radius below which a location or SOS event is considered relevant
pub const DEFAULT_RADIUS_METERS: f64 = 5_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    #[error("coordinate is not a finite number: {0}")]
    NonFinite(f64),

    #[error("latitude out of range [-90, 90]: {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitude out of range [-180, 180]: {0}")]
    LongitudeOutOfRange(f64),
}

/// A validated WGS-84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        ensure_finite(lat)?;
        ensure_finite(lng)?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Distance to `other` in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Haversine distance in meters between two coordinates given in degrees.
///
/// # Errors
///
/// Returns [`GeoError::NonFinite`] if any input is NaN or infinite.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64, GeoError> {
    for value in [lat1, lon1, lat2, lon2] {
        ensure_finite(value)?;
    }
    Ok(haversine(lat1, lon1, lat2, lon2))
}

fn ensure_finite(value: f64) -> Result<(), GeoError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GeoError::NonFinite(value))
    }
}

fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // rounding can push `a` a hair outside [0, 1] for near-antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}
