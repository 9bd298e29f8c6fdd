use std::sync::Arc;

use tokio::sync::RwLock;

use crate::alert::{self, AlertLevel};
use crate::feed::Reading;

/// Shared air-quality state: the last successful reading.
///
/// The previous PM10 index used for threshold comparison is the index of
/// the stored reading, so both always change together under one write
/// lock. Readers get an `Arc` to an immutable reading and never observe
/// a half-applied update.
#[derive(Clone, Default)]
pub struct AirState {
    current: Arc<RwLock<Option<Arc<Reading>>>>,
}

impl AirState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest reading, or `None` before the first successful fetch.
    pub async fn snapshot(&self) -> Option<Arc<Reading>> {
        self.current.read().await.clone()
    }

    /// PM10 index of the last successful fetch.
    pub async fn previous_index(&self) -> Option<i64> {
        self.current.read().await.as_ref().map(|r| r.pm10)
    }

    /// Replace the stored reading and report the threshold crossing, if
    /// any, between the previous and the new PM10 index.
    pub async fn apply_update(&self, reading: Reading) -> Option<AlertLevel> {
        let mut current = self.current.write().await;
        let previous = current.as_ref().map(|r| r.pm10);
        let alert = alert::evaluate(previous, reading.pm10);
        *current = Some(Arc::new(reading));
        alert
    }
}
