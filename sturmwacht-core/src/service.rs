//! The cached fetch → classify → assess pipeline behind the weather banner.

use chrono::Utc;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    Config, Location, WeatherError, WeatherProvider,
    alert::{classify, derive_warnings},
    assessment::assess,
    cache::TtlCache,
    model::WeatherReport,
    provider::default_provider_from_config,
};

pub const CURRENT_WEATHER_KEY: &str = "current_weather";

/// Lifecycle of the most recent `get_weather_data` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Unfetched,
    Fetching,
    Ready,
    Failed,
}

/// Owns one provider and one cache.
///
/// Construct once per process and share it (e.g. behind an `Arc`); never share
/// an instance across tenants.
#[derive(Debug)]
pub struct WeatherService {
    provider: Box<dyn WeatherProvider>,
    location: Location,
    cache: TtlCache<WeatherReport>,
    state: Mutex<FetchState>,
}

impl WeatherService {
    pub fn new(provider: Box<dyn WeatherProvider>, location: Location, ttl: Duration) -> Self {
        Self {
            provider,
            location,
            cache: TtlCache::new(ttl),
            state: Mutex::new(FetchState::Unfetched),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = default_provider_from_config(config)?;
        info!(
            provider = %provider.id(),
            location = %config.location.name,
            ttl_secs = config.cache_ttl_secs,
            "weather service ready"
        );
        Ok(Self::new(provider, config.location.clone(), config.cache_ttl()))
    }

    pub fn state(&self) -> FetchState {
        *self.state.lock()
    }

    pub fn cache(&self) -> &TtlCache<WeatherReport> {
        &self.cache
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Returns the cached report, or fetches, classifies and caches a fresh one.
    ///
    /// Failures are not cached and not retried; the caller polls again later.
    pub async fn get_weather_data(&self) -> Result<WeatherReport, WeatherError> {
        if let Some(cached) = self.cache.get(CURRENT_WEATHER_KEY) {
            debug!("serving weather report from cache");
            self.set_state(FetchState::Ready);
            return Ok(cached);
        }

        self.set_state(FetchState::Fetching);

        let weather = match self.provider.current(&self.location).await {
            Ok(reading) => reading,
            Err(err) => {
                warn!(provider = %self.provider.id(), error = %err, "weather fetch failed");
                self.set_state(FetchState::Failed);
                return Err(err);
            }
        };

        let now = Utc::now();
        let warnings = derive_warnings(&weather, now);
        let alert_level = classify(&weather, &warnings);
        let assessment = assess(alert_level, &weather);

        info!(
            wind_kmh = weather.wind_speed,
            gust_kmh = ?weather.wind_gust,
            level = %alert_level,
            "weather report refreshed"
        );

        let report = WeatherReport {
            weather,
            warnings,
            alert_level,
            assessment,
            last_updated: now,
        };

        self.cache.set(CURRENT_WEATHER_KEY, report.clone());
        self.set_state(FetchState::Ready);
        Ok(report)
    }

    fn set_state(&self, state: FetchState) {
        *self.state.lock() = state;
    }
}
