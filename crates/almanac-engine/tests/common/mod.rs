#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use almanac_engine::{
    AlmanacConfig, AlmanacError, Coordinates, DailySeries, ForecastSource, HistoricalSource,
};
use chrono::{Datelike, Duration, NaiveDate};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Observed max for a day; min is always 20 degrees lower.
pub fn observed_max(date: NaiveDate) -> f64 {
    40.0 + f64::from(date.ordinal() % 40) + 0.5
}

/// Forecast max for a day; min is always 15 degrees lower.
pub fn forecast_max(date: NaiveDate) -> f64 {
    70.0 + f64::from(date.day() % 10) + 0.2
}

pub fn config_in(dir: &Path) -> AlmanacConfig {
    AlmanacConfig {
        data_path: dir.join("data").join("historical_weather.csv"),
        ..AlmanacConfig::default()
    }
}

/// In-memory weather service. History synthesizes one row per requested day,
/// the last `history_lag` of them without temperatures; the forecast covers `forecast_len` days from `forecast_today`, minus any
/// dates listed in `forecast_missing`.
pub struct FakeWeather {
    pub history_calls: AtomicUsize,
    pub forecast_calls: AtomicUsize,
    pub history_ranges: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    pub fail_history: AtomicBool,
    pub fail_forecast: AtomicBool,
    pub history_lag: usize,
    pub forecast_today: NaiveDate,
    pub forecast_len: i64,
    pub forecast_missing: Vec<NaiveDate>,
}

impl FakeWeather {
    pub fn new(forecast_today: NaiveDate) -> Self {
        Self {
            history_calls: AtomicUsize::new(0),
            forecast_calls: AtomicUsize::new(0),
            history_ranges: Mutex::new(Vec::new()),
            fail_history: AtomicBool::new(false),
            fail_forecast: AtomicBool::new(false),
            history_lag: 0,
            forecast_today,
            forecast_len: 16,
            forecast_missing: Vec::new(),
        }
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn forecast_calls(&self) -> usize {
        self.forecast_calls.load(Ordering::SeqCst)
    }
}

impl HistoricalSource for FakeWeather {
    async fn fetch_history(
        &self,
        _at: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries, AlmanacError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.history_ranges.lock().unwrap().push((start, end));
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(AlmanacError::Fetch("archive unreachable".into()));
        }

        let days: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
        let complete = days.len().saturating_sub(self.history_lag);
        let mut daily = DailySeries::default();
        for (i, day) in days.into_iter().enumerate() {
            let known = i < complete;
            daily.time.push(day.format("%Y-%m-%d").to_string());
            daily.temp_max.push(known.then(|| observed_max(day)));
            daily.temp_min.push(known.then(|| observed_max(day) - 20.0));
        }
        Ok(daily)
    }
}

impl ForecastSource for FakeWeather {
    async fn fetch_forecast(&self, _at: Coordinates) -> Result<DailySeries, AlmanacError> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_forecast.load(Ordering::SeqCst) {
            return Err(AlmanacError::Fetch("forecast unreachable".into()));
        }

        let mut daily = DailySeries::default();
        for offset in 0..self.forecast_len {
            let day = self.forecast_today + Duration::days(offset);
            if self.forecast_missing.contains(&day) {
                continue;
            }
            daily.time.push(day.format("%Y-%m-%d").to_string());
            daily.temp_max.push(Some(forecast_max(day)));
            daily.temp_min.push(Some(forecast_max(day) - 15.0));
        }
        Ok(daily)
    }
}
