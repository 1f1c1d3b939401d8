//! Engine configuration: the fixed location, the historical range, storage,
//! and the remote endpoints.

use std::path::PathBuf;

use std::fmt;

use chrono::NaiveDate;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AlmanacError, Result};
use crate::source::Coordinates;

pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/era5";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// The largest window the forecast endpoint serves.
pub const MAX_FORECAST_DAYS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlmanacConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// First day of the historical range.
    #[serde(deserialize_with = "deserialize_date")]
    pub start_date: NaiveDate,
    /// Durable storage for the historical records.
    pub data_path: PathBuf,
    pub archive_url: String,
    pub forecast_url: String,
    /// Size of the forecast window, today included.
    pub forecast_days: u32,
    pub request_timeout_secs: u64,
}

impl Default for AlmanacConfig {
    fn default() -> Self {
        Self {
            // Charlottesville, VA
            latitude: 38.0302,
            longitude: -78.4769,
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            data_path: PathBuf::from("data/historical_weather.csv"),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            forecast_days: MAX_FORECAST_DAYS,
            request_timeout_secs: 30,
        }
    }
}

impl AlmanacConfig {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// How many days after today the forecast still covers.
    pub fn forecast_horizon_days(&self) -> i64 {
        i64::from(self.forecast_days) - 1
    }

    /// Check every field and report all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut issues: Vec<String> = Vec::new();

        if !(-90.0..=90.0).contains(&self.latitude) {
            issues.push("latitude must be in [-90, 90]".into());
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            issues.push("longitude must be in [-180, 180]".into());
        }
        if self.forecast_days == 0 || self.forecast_days > MAX_FORECAST_DAYS {
            issues.push(format!("forecast_days must be in 1..={MAX_FORECAST_DAYS}"));
        }
        if self.request_timeout_secs == 0 {
            issues.push("request_timeout_secs must be > 0".into());
        }
        if self.data_path.as_os_str().is_empty() {
            issues.push("data_path must not be empty".into());
        }
        if self.archive_url.trim().is_empty() {
            issues.push("archive_url must not be empty".into());
        }
        if self.forecast_url.trim().is_empty() {
            issues.push("forecast_url must not be empty".into());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(AlmanacError::Config(format!(
                "Invalid config:\n - {}",
                issues.join("\n - ")
            )))
        }
    }
}

// ── Date fields ─────────────────────────────────────────────────────────────

/// Accept a `YYYY-MM-DD` string, or a native TOML local date, which the
/// TOML deserializer hands over as a one-entry map holding its literal.
fn deserialize_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<NaiveDate, D::Error> {
    deserializer.deserialize_any(DateVisitor)
}

struct DateVisitor;

impl<'de> Visitor<'de> for DateVisitor {
    type Value = NaiveDate;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a YYYY-MM-DD date")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<NaiveDate, E> {
        NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
            .map_err(|e| E::custom(format!("invalid date '{v}': {e}")))
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut map: A,
    ) -> std::result::Result<NaiveDate, A::Error> {
        match map.next_entry::<String, String>()? {
            Some((_, literal)) => self.visit_str(&literal),
            None => Err(de::Error::custom("expected a date, found an empty table")),
        }
    }
}
