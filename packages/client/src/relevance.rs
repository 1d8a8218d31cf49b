//! Client-side relevance filter.
//!
//! Decides whether a broadcast concerns this user by distance from the
//! user's own last-known position, and keeps the set of nearby users.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tourwatch_server::domain::{
    Coordinates, DisplayName, EmergencyEvent, LocationUpdate, PositionReport, UserId,
};
use tourwatch_shared::time::Clock;

/// Outcome of one relevance decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relevance {
    /// The event came from this user
    SelfOrigin,
    /// No own position yet, so nothing can be decided
    UnknownOwnPosition,
    OutOfRange { distance_meters: f64 },
    Relevant { distance_meters: f64 },
}

impl Relevance {
    pub fn is_relevant(&self) -> bool {
        matches!(self, Relevance::Relevant { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearbyUser {
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub position: PositionReport,
    /// Distance from own position at the time of listing
    pub distance_meters: f64,
    /// Local receipt time (ms)
    pub last_seen: i64,
}

/// Last update received from a peer that was in range
#[derive(Debug, Clone)]
struct TrackedUser {
    display_name: DisplayName,
    position: PositionReport,
    last_seen: i64,
}

pub struct RelevanceFilter {
    self_id: UserId,
    radius_meters: f64,
    ttl_millis: i64,
    nearby: HashMap<UserId, TrackedUser>,
    clock: Arc<dyn Clock>,
}

impl RelevanceFilter {
    pub fn new(self_id: UserId, radius_meters: f64, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            self_id,
            radius_meters,
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            nearby: HashMap::new(),
            clock,
        }
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Distance rule shared by every event kind
    pub fn decide(
        &self,
        own: Option<&Coordinates>,
        source_user: &UserId,
        source: &Coordinates,
    ) -> Relevance {
        if *source_user == self.self_id {
            return Relevance::SelfOrigin;
        }
        let Some(own) = own else {
            return Relevance::UnknownOwnPosition;
        };

        let distance_meters = own.distance_to(source);
        if distance_meters < self.radius_meters {
            Relevance::Relevant { distance_meters }
        } else {
            Relevance::OutOfRange { distance_meters }
        }
    }

    /// Apply a `user-location` broadcast to the nearby set.
    ///
    /// A relevant update adds or refreshes the user; an out-of-range one
    /// drops the user immediately.
    pub fn on_user_location(
        &mut self,
        own: Option<&Coordinates>,
        update: LocationUpdate,
    ) -> Relevance {
        let relevance = self.decide(own, &update.user_id, &update.position.coordinates);

        match relevance {
            Relevance::Relevant { .. } => {
                let entry = TrackedUser {
                    display_name: update.display_name,
                    position: update.position,
                    last_seen: self.clock.now_millis(),
                };
                self.nearby.insert(update.user_id, entry);
            }
            Relevance::OutOfRange { .. } => {
                if self.nearby.remove(&update.user_id).is_some() {
                    tracing::debug!("'{}' moved out of range", update.user_id.as_str());
                }
            }
            Relevance::SelfOrigin | Relevance::UnknownOwnPosition => {}
        }

        relevance
    }

    /// Decide whether an `sos-alert` should be surfaced
    pub fn on_sos_alert(&self, own: Option<&Coordinates>, event: &EmergencyEvent) -> Relevance {
        self.decide(own, &event.source_user_id, &event.position)
    }

    /// Drop entries not refreshed within the TTL
    pub fn evict_stale(&mut self) -> usize {
        let now = self.clock.now_millis();
        let ttl = self.ttl_millis;
        let before = self.nearby.len();
        self.nearby
            .retain(|_, user| now.saturating_sub(user.last_seen) < ttl);
        before - self.nearby.len()
    }

    /// Users within the radius of our current position, nearest first.
    ///
    /// Distances are measured against `own` now, so a peer left behind by our
    /// own move is not listed. Nothing is listed while `own` is unknown.
    pub fn nearby_users(&mut self, own: Option<&Coordinates>) -> Vec<NearbyUser> {
        self.evict_stale();
        let Some(own) = own else {
            return Vec::new();
        };

        let mut users: Vec<NearbyUser> = self
            .nearby
            .iter()
            .filter_map(|(user_id, tracked)| {
                let distance_meters = own.distance_to(&tracked.position.coordinates);
                (distance_meters < self.radius_meters).then(|| NearbyUser {
                    user_id: user_id.clone(),
                    display_name: tracked.display_name.clone(),
                    position: tracked.position.clone(),
                    distance_meters,
                    last_seen: tracked.last_seen,
                })
            })
            .collect();
        users.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        users
    }

    /// Nearby users within the radius of `center` (e.g. a fresh SOS fix)
    pub fn count_nearby(&mut self, center: &Coordinates) -> usize {
        self.evict_stale();
        self.nearby
            .values()
            .filter(|user| center.is_within(&user.position.coordinates, self.radius_meters))
            .count()
    }
}
