//! Position source and the latest-position cell.
//!
//! A producer task polls a [`PositionSource`] on its own schedule and
//! publishes each new fix into [`LatestPosition`]. Readers (the relevance
//! filter, the alert flow, the session writer) only ever look at the cell,
//! so a slow fix never stalls them.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{RwLock, watch};
use tourwatch_server::domain::{Accuracy, Coordinates, PositionReport, Timestamp};
use tourwatch_shared::time::Clock;

/// Why a position could not be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable")]
    Unavailable,

    #[error("timed out waiting for a location fix")]
    Timeout,
}

/// Single-shot device position
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<PositionReport, PositionError>;
}

/// Position entered by hand at the prompt (`/move`) or on the command line
pub struct ManualPositionSource {
    fix: RwLock<Option<PositionReport>>,
    clock: Arc<dyn Clock>,
}

impl ManualPositionSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            fix: RwLock::new(None),
            clock,
        }
    }

    /// Replace the current fix, stamped with the clock's time
    pub async fn set(
        &self,
        lat: f64,
        lng: f64,
        accuracy: Option<f64>,
    ) -> Result<PositionReport, tourwatch_server::domain::ValueObjectError> {
        let report = PositionReport::new(
            Coordinates::new(lat, lng)?,
            accuracy.map(Accuracy::new).transpose()?,
            Timestamp::new(self.clock.now_millis()),
        );
        *self.fix.write().await = Some(report.clone());
        Ok(report)
    }
}

#[async_trait]
impl PositionSource for ManualPositionSource {
    async fn current_position(&self) -> Result<PositionReport, PositionError> {
        self.fix.read().await.clone().ok_or(PositionError::Unavailable)
    }
}

/// Single-slot cell holding the most recent fix
///
/// Cloning gives another handle to the same cell.
#[derive(Clone)]
pub struct LatestPosition {
    tx: Arc<watch::Sender<Option<PositionReport>>>,
}

impl Default for LatestPosition {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestPosition {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Overwrite the cell. Returns `false` if the value did not change.
    pub fn publish(&self, report: PositionReport) -> bool {
        self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&report) {
                return false;
            }
            *current = Some(report);
            true
        })
    }

    pub fn get(&self) -> Option<PositionReport> {
        self.tx.borrow().clone()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.tx.borrow().as_ref().map(|r| r.coordinates)
    }

    /// Receiver notified on every change
    pub fn subscribe(&self) -> watch::Receiver<Option<PositionReport>> {
        self.tx.subscribe()
    }
}

/// Poll `source` every `interval` and publish new fixes into `cell`.
///
/// Failed polls keep the previous fix.
pub fn spawn_position_producer(
    source: Arc<dyn PositionSource>,
    cell: LatestPosition,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_error = None;

        loop {
            ticker.tick().await;
            match source.current_position().await {
                Ok(report) => {
                    last_error = None;
                    if cell.publish(report) {
                        tracing::debug!("Published new position fix");
                    }
                }
                Err(e) => {
                    if last_error != Some(e) {
                        tracing::debug!("Position poll failed: {}", e);
                    }
                    last_error = Some(e);
                }
            }
        }
    })
}

/// Single-shot acquisition bounded by `timeout`
pub async fn acquire_position(
    source: &dyn PositionSource,
    timeout: Duration,
) -> Result<PositionReport, PositionError> {
    match tokio::time::timeout(timeout, source.current_position()).await {
        Ok(result) => result,
        Err(_) => Err(PositionError::Timeout),
    }
}
