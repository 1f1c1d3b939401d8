//! Routing a resolved date to history or forecast, and the answers that come
//! back.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::source::WeatherRecord;

/// Where a resolved date is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Before the first day of the historical range.
    BeforeHistory,
    /// From the start date through today.
    Historical,
    /// Strictly after today and within the forecast horizon.
    Forecast,
    /// Past the forecast horizon.
    BeyondForecast,
}

/// Decide how to serve `date`.
///
/// `horizon_days` is the last day offset the forecast covers (15 for a
/// 16-day window). Today itself is always historical.
pub fn route(date: NaiveDate, today: NaiveDate, start: NaiveDate, horizon_days: i64) -> Route {
    if date < start {
        Route::BeforeHistory
    } else if date <= today {
        Route::Historical
    } else if (date - today).num_days() <= horizon_days {
        Route::Forecast
    } else {
        Route::BeyondForecast
    }
}

/// The reply to one question. `Display` renders the user-facing sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    Historical(WeatherRecord),
    Forecast {
        date: NaiveDate,
        temp_max: f64,
        temp_min: f64,
    },
    Unresolved {
        start: NaiveDate,
        forecast_days: u32,
    },
    BeforeHistory {
        start: NaiveDate,
    },
    NoHistoricalData {
        date: NaiveDate,
    },
    BeyondForecast {
        forecast_days: u32,
    },
    NoForecastData {
        date: NaiveDate,
    },
}

impl Answer {
    /// Whether the question was answered with temperatures.
    pub fn is_data(&self) -> bool {
        matches!(self, Answer::Historical(_) | Answer::Forecast { .. })
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Historical(r) => write!(
                f,
                "On {}, max was {:.1}°F and min was {:.1}°F.",
                r.date, r.temp_max, r.temp_min
            ),
            Answer::Forecast {
                date,
                temp_max,
                temp_min,
            } => write!(
                f,
                "On {date}, the forecast max will be {temp_max:.1}°F and min will be {temp_min:.1}°F."
            ),
            Answer::Unresolved {
                start,
                forecast_days,
            } => write!(
                f,
                "I couldn't parse your date. Try something like: 'yesterday', 'last Monday', \
                 'today', 'tomorrow', 'Thursday', 'next Thursday', 'MM/DD/YYYY', or 'YYYY-MM-DD' \
                 (Historical range: {start} to today; Forecast: next {forecast_days} days)"
            ),
            Answer::BeforeHistory { start } => {
                write!(f, "Sorry, I only have historical data from {start} onward.")
            }
            Answer::NoHistoricalData { date } => write!(f, "Sorry, I have no data for {date}."),
            Answer::BeyondForecast { forecast_days } => write!(
                f,
                "Sorry, I can only forecast up to the next {forecast_days} days."
            ),
            Answer::NoForecastData { date } => {
                write!(f, "Sorry, I have no forecast data for {date}.")
            }
        }
    }
}
