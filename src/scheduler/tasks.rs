use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::info;

use crate::poller::Poller;
use crate::scheduler::Scheduler;
use crate::state::AirState;

/// Register built-in background tasks: the air quality poll and an
/// hourly heartbeat.
pub async fn register_builtin_tasks(
    scheduler: &Scheduler,
    poller: Arc<Poller>,
    state: AirState,
    poll_period: Duration,
) -> anyhow::Result<()> {
    scheduler
        .add_repeated_job(
            poll_period,
            "pull-air-quality",
            Box::new(move || {
                let poller = poller.clone();
                async move {
                    poller.poll_once().await;
                }
                .boxed()
            }),
        )
        .await?;

    // Heartbeat: log that the bot is alive every hour
    scheduler
        .add_cron_job(
            "0 0 * * * *",
            "heartbeat",
            Box::new(move || {
                let state = state.clone();
                async move {
                    info!("Heartbeat: bot is alive, {}", heartbeat_status(&state).await);
                }
                .boxed()
            }),
        )
        .await?;

    Ok(())
}

async fn heartbeat_status(state: &AirState) -> String {
    match state.snapshot().await {
        Some(reading) => {
            let age = Utc::now().signed_duration_since(reading.fetched_at);
            format!(
                "last reading PM10={} taken {} min ago",
                reading.pm10,
                age.num_minutes()
            )
        }
        None => "no air quality data received yet".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Reading;

    #[tokio::test]
    async fn test_heartbeat_status() {
        let state = AirState::new();
        assert_eq!(
            heartbeat_status(&state).await,
            "no air quality data received yet"
        );

        state
            .apply_update(Reading {
                pm10: 64,
                pm25: 30,
                location_name: "Lviv, Ukraine".to_string(),
                location_url: "https://aqicn.org/city/ukraine/lviv".to_string(),
                fetched_at: Utc::now() - chrono::Duration::minutes(12),
            })
            .await;
        assert_eq!(
            heartbeat_status(&state).await,
            "last reading PM10=64 taken 12 min ago"
        );
    }
}
