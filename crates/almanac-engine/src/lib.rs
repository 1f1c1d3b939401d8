//! # almanac-engine
//!
//! Answers questions like "what was it like last Monday?" or "how warm will
//! it be next Thursday?" for one fixed location.
//!
//! A question goes through four steps: normalize the phrase, resolve it to a
//! calendar date, route the date to the historical range or the forecast
//! window, and render the answer. Historical days come from a local,
//! append-only cache that is extended on demand; forecasts are fetched live.
//!
//! ## Modules
//!
//! - [`resolver`]: phrase → date, via past-relative, future-relative and explicit-format strategies
//! - [`store`]: gap-free CSV-backed cache of daily max/min temperatures
//! - [`dispatch`]: routing decision table and the [`Answer`] texts
//! - [`almanac`]: the [`Almanac`] facade tying the pieces together
//! - [`source`]: remote source traits and the daily-series payload
//! - [`open_meteo`]: Open-Meteo archive and forecast client
//! - [`config`]: location, ranges, storage and endpoints
//! - [`error`]: error types

pub mod almanac;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod open_meteo;
pub mod resolver;
pub mod source;
pub mod store;

pub use almanac::Almanac;
pub use config::AlmanacConfig;
pub use dispatch::{route, Answer, Route};
pub use error::AlmanacError;
pub use open_meteo::OpenMeteoClient;
pub use resolver::{
    normalize_phrase, resolve, resolve_phrase, Phrase, ResolvedDate, Strategy, WeekdayRule,
};
pub use source::{Coordinates, DailySeries, ForecastSource, HistoricalSource, WeatherRecord};
pub use store::HistoricalStore;
