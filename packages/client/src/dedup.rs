//! Duplicate notification suppression.
//!
//! Identical notification text seen again within a short window is not shown
//! twice. Only the most recent few notifications are remembered.

use std::{collections::VecDeque, sync::Arc};

use tourwatch_shared::time::Clock;

pub const DEFAULT_WINDOW_MILLIS: i64 = 1000;
pub const DEFAULT_CAPACITY: usize = 5;

pub struct NotificationDeduplicator {
    window_millis: i64,
    capacity: usize,
    /// (text, shown at), oldest first
    recent: VecDeque<(String, i64)>,
    clock: Arc<dyn Clock>,
}

impl NotificationDeduplicator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_window(DEFAULT_WINDOW_MILLIS, DEFAULT_CAPACITY, clock)
    }

    pub fn with_window(window_millis: i64, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            window_millis,
            capacity,
            recent: VecDeque::with_capacity(capacity),
            clock,
        }
    }

    /// Returns `true` and records `text` if it should be shown now.
    pub fn should_notify(&mut self, text: &str) -> bool {
        let now = self.clock.now_millis();
        let duplicate = self
            .recent
            .iter()
            .any(|(seen, at)| seen == text && now.saturating_sub(*at) < self.window_millis);
        if duplicate {
            tracing::debug!("Suppressed duplicate notification");
            return false;
        }

        self.recent.push_back((text.to_string(), now));
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
        true
    }
}
