//! UseCase: プレゼンス照会
//!
//! HTTP API から Registry を読み取るためのユースケース。書き込みは行わない。

use std::sync::Arc;

use crate::domain::{Coordinates, PresenceRecord, PresenceRepository};

/// A registry entry together with its distance from the query point
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyPresence {
    pub record: PresenceRecord,
    pub distance_meters: f64,
}

pub struct GetPresenceUseCase {
    repository: Arc<dyn PresenceRepository>,
}

impl GetPresenceUseCase {
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// All known positions, ordered by connection id
    pub async fn snapshot(&self) -> Vec<PresenceRecord> {
        self.repository.snapshot().await
    }

    /// Connections that have reported a position
    pub async fn located(&self) -> usize {
        self.repository.count().await
    }

    /// Entries strictly closer than `radius_meters` to `center`, nearest first
    pub async fn nearby(&self, center: &Coordinates, radius_meters: f64) -> Vec<NearbyPresence> {
        let mut nearby: Vec<NearbyPresence> = self
            .repository
            .snapshot()
            .await
            .into_iter()
            .map(|record| {
                let distance_meters = center.distance_to(&record.position.coordinates);
                NearbyPresence {
                    record,
                    distance_meters,
                }
            })
            .filter(|n| n.distance_meters < radius_meters)
            .collect();

        nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        nearby
    }
}
