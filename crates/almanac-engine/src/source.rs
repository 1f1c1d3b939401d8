//! Remote weather sources and the daily-series payload they return.
//!
//! The historical archive and the forecast service both answer with the same
//! column-oriented `daily` block: a list of ISO dates plus parallel lists of
//! maximum and minimum temperatures. [`DailySeries`] is that block;
//! [`DailySeries::into_records`] is the transform step that turns it into
//! [`WeatherRecord`]s for a requested range.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AlmanacError, Result};

/// The fixed location every query is about.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One day of observed temperatures, in °F.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
}

/// Column-oriented daily data as returned by the weather services.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DailySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(rename = "temperature_2m_max", default)]
    pub temp_max: Vec<Option<f64>>,
    #[serde(rename = "temperature_2m_min", default)]
    pub temp_min: Vec<Option<f64>>,
}

impl DailySeries {
    fn check_columns(&self) -> Result<()> {
        if self.time.len() != self.temp_max.len() || self.time.len() != self.temp_min.len() {
            return Err(AlmanacError::MalformedResponse(format!(
                "daily columns differ in length (time={}, max={}, min={})",
                self.time.len(),
                self.temp_max.len(),
                self.temp_min.len()
            )));
        }
        Ok(())
    }

    /// Max/min for `date`, if the series lists it with both temperatures.
    pub fn temperatures_on(&self, date: NaiveDate) -> Option<(f64, f64)> {
        let iso = date.format("%Y-%m-%d").to_string();
        let idx = self.time.iter().position(|t| *t == iso)?;
        match (self.temp_max.get(idx)?, self.temp_min.get(idx)?) {
            (Some(max), Some(min)) => Some((*max, *min)),
            _ => None,
        }
    }

    /// Transform the series into records for the closed range `[start, end]`.
    ///
    /// Rows must begin at `start` and advance one day at a time. The result is
    /// the longest prefix of the range whose rows carry both temperatures; the
    /// archive reports the most recent days as `null` until they are
    /// reanalyzed, and those days are left for a later refresh.
    pub fn into_records(self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WeatherRecord>> {
        self.check_columns()?;

        let mut records = Vec::with_capacity(self.time.len());
        let mut expected = start;
        for ((time, max), min) in self.time.iter().zip(&self.temp_max).zip(&self.temp_min) {
            if expected > end {
                return Err(AlmanacError::MalformedResponse(format!(
                    "row {time} lies after the requested end {end}"
                )));
            }
            let date = NaiveDate::parse_from_str(time, "%Y-%m-%d").map_err(|e| {
                AlmanacError::MalformedResponse(format!("bad date '{time}': {e}"))
            })?;
            if date != expected {
                return Err(AlmanacError::MalformedResponse(format!(
                    "expected a row for {expected}, got {date}"
                )));
            }

            let (Some(temp_max), Some(temp_min)) = (max, min) else {
                tracing::warn!(
                    first_missing = %date,
                    requested_end = %end,
                    "archive has no temperatures yet; keeping the complete prefix"
                );
                break;
            };
            records.push(WeatherRecord {
                date,
                temp_max: *temp_max,
                temp_min: *temp_min,
            });

            expected = match expected.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        Ok(records)
    }
}

/// Daily history for a closed date range.
pub trait HistoricalSource: Send + Sync {
    /// One row per day of `[start, end]`, both ends inclusive.
    fn fetch_history(
        &self,
        at: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<DailySeries>> + Send;
}

/// Short-range forecast starting today.
pub trait ForecastSource: Send + Sync {
    /// The forecast window; its first day is today (UTC).
    fn fetch_forecast(&self, at: Coordinates) -> impl Future<Output = Result<DailySeries>> + Send;
}

impl<T: HistoricalSource> HistoricalSource for Arc<T> {
    fn fetch_history(
        &self,
        at: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<DailySeries>> + Send {
        (**self).fetch_history(at, start, end)
    }
}

impl<T: ForecastSource> ForecastSource for Arc<T> {
    fn fetch_forecast(&self, at: Coordinates) -> impl Future<Output = Result<DailySeries>> + Send {
        (**self).fetch_forecast(at)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
