//! The question-answering entry point.
//!
//! [`Almanac`] owns the configuration, the remote source, and the
//! [`HistoricalStore`]. The store is built once by [`Almanac::open`] and then
//! only changes through [`Almanac::refresh`], which runs lazily before every
//! historical lookup. Refreshes are serialized by a write lock; lookups share
//! a read lock.

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::AlmanacConfig;
use crate::dispatch::{route, Answer, Route};
use crate::error::Result;
use crate::resolver::{resolve_phrase, ResolvedDate};
use crate::source::{ForecastSource, HistoricalSource};
use crate::store::HistoricalStore;

pub struct Almanac<S> {
    config: AlmanacConfig,
    source: S,
    store: RwLock<HistoricalStore>,
}

impl<S> Almanac<S>
where
    S: HistoricalSource + ForecastSource,
{
    /// Validate `config` and open (or bootstrap) the historical store.
    pub async fn open(config: AlmanacConfig, source: S, today: NaiveDate) -> Result<Self> {
        config.validate()?;
        let store = HistoricalStore::open(
            config.data_path.clone(),
            config.start_date,
            config.coordinates(),
            today,
            &source,
        )
        .await?;
        Ok(Self::with_store(config, source, store))
    }

    /// Assemble from an already opened store.
    pub fn with_store(config: AlmanacConfig, source: S, store: HistoricalStore) -> Self {
        Self {
            config,
            source,
            store: RwLock::new(store),
        }
    }

    pub fn config(&self) -> &AlmanacConfig {
        &self.config
    }

    /// Answer raw input, using the current UTC date as today.
    pub async fn generate_response(&self, raw: &str) -> Result<String> {
        self.generate_response_at(raw, Utc::now().date_naive()).await
    }

    /// Answer raw input relative to `today`.
    pub async fn generate_response_at(&self, raw: &str, today: NaiveDate) -> Result<String> {
        Ok(self.respond(raw, today).await?.to_string())
    }

    /// Resolve and answer, keeping the typed result.
    pub async fn respond(&self, raw: &str, today: NaiveDate) -> Result<Answer> {
        match resolve_phrase(raw, today) {
            Some(resolved) => self.answer(resolved, today).await,
            None => Ok(Answer::Unresolved {
                start: self.config.start_date,
                forecast_days: self.config.forecast_days,
            }),
        }
    }

    /// Serve a resolved date from history or the forecast.
    ///
    /// Fetch failures are returned as errors; they are never turned into a
    /// "no data" answer.
    pub async fn answer(&self, resolved: ResolvedDate, today: NaiveDate) -> Result<Answer> {
        let date = resolved.date;
        let target = route(
            date,
            today,
            self.config.start_date,
            self.config.forecast_horizon_days(),
        );
        debug!(%date, %today, route = ?target, "dispatching");

        match target {
            Route::BeforeHistory => Ok(Answer::BeforeHistory {
                start: self.config.start_date,
            }),
            Route::Historical => {
                self.refresh(today).await?;
                let store = self.store.read().await;
                Ok(match store.lookup(date) {
                    Some(record) => Answer::Historical(*record),
                    None => Answer::NoHistoricalData { date },
                })
            }
            Route::Forecast => {
                let daily = self
                    .source
                    .fetch_forecast(self.config.coordinates())
                    .await?;
                Ok(match daily.temperatures_on(date) {
                    Some((temp_max, temp_min)) => Answer::Forecast {
                        date,
                        temp_max,
                        temp_min,
                    },
                    None => Answer::NoForecastData { date },
                })
            }
            Route::BeyondForecast => Ok(Answer::BeyondForecast {
                forecast_days: self.config.forecast_days,
            }),
        }
    }

    /// Bring the store up to `today`; returns the number of days appended.
    pub async fn refresh(&self, today: NaiveDate) -> Result<usize> {
        if self.store.read().await.is_current(today) {
            return Ok(0);
        }
        let mut store = self.store.write().await;
        store
            .refresh(self.config.coordinates(), today, &self.source)
            .await
    }

    /// Number of days currently cached.
    pub async fn stored_days(&self) -> usize {
        self.store.read().await.len()
    }
}
