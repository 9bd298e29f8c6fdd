use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::alert::{AlertLevel, AqiBand};
use crate::feed::FeedSource;
use crate::notify::AlertDispatcher;
use crate::state::AirState;

/// Result of a single fetch-and-evaluate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another cycle was still running.
    Skipped,
    /// Fetch failed; state left untouched.
    Failed,
    Updated { alert: Option<AlertLevel> },
}

/// Fetches the feed, updates shared state and fires threshold alerts.
pub struct Poller {
    source: Arc<dyn FeedSource>,
    state: AirState,
    dispatcher: AlertDispatcher,
    in_flight: Mutex<()>,
}

impl Poller {
    pub fn new(source: Arc<dyn FeedSource>, state: AirState, dispatcher: AlertDispatcher) -> Self {
        Self {
            source,
            state,
            dispatcher,
            in_flight: Mutex::new(()),
        }
    }

    /// Run one cycle. Cycles never overlap: a call made while another is
    /// in progress returns `Skipped` immediately.
    pub async fn poll_once(&self) -> PollOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Previous air quality fetch still running, skipping this tick");
            return PollOutcome::Skipped;
        };

        let reading = match self.source.fetch().await {
            Ok(reading) => reading,
            Err(e) => {
                error!("Error pulling data: {:#}", e);
                return PollOutcome::Failed;
            }
        };

        let previous = self.state.previous_index().await;
        debug!(
            location = %reading.location_name,
            previous = ?previous,
            pm10 = reading.pm10,
            pm25 = reading.pm25,
            band = %AqiBand::from_index(reading.pm10),
            "Air quality updated"
        );

        let alert = self.state.apply_update(reading.clone()).await;
        if let Some(level) = alert {
            info!(%level, pm10 = reading.pm10, "Air quality crossed a threshold");
            self.dispatcher.dispatch(level, &reading).await;
        }

        PollOutcome::Updated { alert }
    }
}
