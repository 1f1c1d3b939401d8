//! Open-Meteo client for the ERA5 archive and the daily forecast.
//!
//! Both endpoints are keyless. Temperatures are requested in °F with dates in
//! UTC, so every row lines up with the UTC "today" used by the resolver.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::AlmanacConfig;
use crate::error::{AlmanacError, Result};
use crate::source::{Coordinates, DailySeries, ForecastSource, HistoricalSource};

const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min";
const USER_AGENT: &str = concat!("almanac/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: DailySeries,
}

/// HTTP client for the archive and forecast endpoints.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    archive_url: String,
    forecast_url: String,
    forecast_days: u32,
}

impl OpenMeteoClient {
    pub fn new(config: &AlmanacConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            archive_url: config.archive_url.clone(),
            forecast_url: config.forecast_url.clone(),
            forecast_days: config.forecast_days,
        })
    }

    async fn get_daily(&self, url: &str, query: &[(&str, String)]) -> Result<DailySeries> {
        debug!(url, ?query, "requesting daily series");

        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AlmanacError::Fetch(format!("HTTP error for {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(500).collect();
            return Err(AlmanacError::Fetch(format!(
                "{url} returned {}: {excerpt}",
                status.as_u16()
            )));
        }

        let body: DailyResponse = resp
            .json()
            .await
            .map_err(|e| AlmanacError::Fetch(format!("JSON parse error for {url}: {e}")))?;

        debug!(rows = body.daily.time.len(), "received daily series");
        Ok(body.daily)
    }
}

fn base_query(at: Coordinates) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", at.latitude.to_string()),
        ("longitude", at.longitude.to_string()),
        ("daily", DAILY_FIELDS.to_string()),
        ("timezone", "UTC".to_string()),
        ("temperature_unit", "fahrenheit".to_string()),
    ]
}

impl HistoricalSource for OpenMeteoClient {
    async fn fetch_history(
        &self,
        at: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries> {
        let mut query = base_query(at);
        query.push(("start_date", start.format("%Y-%m-%d").to_string()));
        query.push(("end_date", end.format("%Y-%m-%d").to_string()));
        self.get_daily(&self.archive_url, &query).await
    }
}

impl ForecastSource for OpenMeteoClient {
    async fn fetch_forecast(&self, at: Coordinates) -> Result<DailySeries> {
        let mut query = base_query(at);
        query.push(("forecast_days", self.forecast_days.to_string()));
        self.get_daily(&self.forecast_url, &query).await
    }
}
