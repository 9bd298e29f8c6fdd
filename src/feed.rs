use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::{Config, REQUEST_TIMEOUT};

/// Latest snapshot fetched from the air-quality feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// US-EPA AQI sub-index for PM10
    pub pm10: i64,
    /// US-EPA AQI sub-index for PM2.5
    pub pm25: i64,
    pub location_name: String,
    pub location_url: String,
    pub fetched_at: DateTime<Utc>,
}

/// Source of air-quality readings.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Reading>;
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    status: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    iaqi: Iaqi,
    city: FeedCity,
}

#[derive(Debug, Deserialize)]
struct Iaqi {
    pm10: Option<IaqiValue>,
    pm25: Option<IaqiValue>,
}

#[derive(Debug, Deserialize)]
struct IaqiValue {
    v: f64,
}

#[derive(Debug, Deserialize)]
struct FeedCity {
    name: String,
    url: String,
}

/// Decode a feed response body into a `Reading`.
pub fn parse_feed(body: &str, fetched_at: DateTime<Utc>) -> Result<Reading> {
    let response: FeedResponse =
        serde_json::from_str(body).context("Failed to parse feed response")?;

    if response.status != "ok" {
        let reason = match &response.data {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        anyhow::bail!("Feed returned status '{}': {}", response.status, reason);
    }

    let data: FeedData =
        serde_json::from_value(response.data).context("Unexpected feed data layout")?;
    let pm10 = data.iaqi.pm10.context("Feed response has no PM10 index")?;
    let pm25 = data.iaqi.pm25.context("Feed response has no PM2.5 index")?;

    Ok(Reading {
        pm10: pm10.v.round() as i64,
        pm25: pm25.v.round() as i64,
        location_name: data.city.name,
        location_url: data.city.url,
        fetched_at,
    })
}

/// Client for the WAQI city feed: `GET <base>/<city>/?token=<key>`.
pub struct WaqiClient {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl WaqiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build feed HTTP client")?;
        Ok(Self {
            client,
            url: feed_url(&config.feed_url, &config.city_slug()),
            token: config.api_key.clone(),
        })
    }
}

fn feed_url(base_url: &str, city_slug: &str) -> String {
    format!("{}/{}/", base_url, city_slug)
}

#[async_trait]
impl FeedSource for WaqiClient {
    async fn fetch(&self) -> Result<Reading> {
        debug!("Requesting air quality feed: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .query(&[("token", &self.token)])
            .send()
            .await
            // the request URL carries the token
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to the feed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Feed API error ({}): {}", status, body);
        }

        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to read feed response body")?;
        parse_feed(&body, Utc::now())
    }
}
