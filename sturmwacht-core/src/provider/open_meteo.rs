use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    WeatherError,
    error::truncate_body,
    model::{Condition, Location, WeatherReading},
    provider::{ProviderId, WeatherProvider, http_client, normalize_degrees, round_percent},
};

const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
wind_speed_10m,wind_direction_10m,wind_gusts_10m,weather_code";

/// Key-free provider backed by api.open-meteo.com.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    base_url: String,
}

impl OpenMeteoProvider {
    pub fn new(timeout: Duration) -> Result<Self, WeatherError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: OmCurrent,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: Option<f64>,
    wind_speed_10m: f64,
    wind_direction_10m: f64,
    wind_gusts_10m: Option<f64>,
    weather_code: i32,
}

/// Maps a WMO weather code onto a condition and its German label.
/// See: https://open-meteo.com/en/docs#weathervariables
pub fn condition_from_wmo(code: i32) -> (Condition, &'static str) {
    match code {
        0 => (Condition::Clear, "Klar"),
        1 => (Condition::Clear, "Überwiegend klar"),
        2 => (Condition::Clouds, "Teilweise bewölkt"),
        3 => (Condition::Clouds, "Bewölkt"),
        45 => (Condition::Mist, "Nebel"),
        48 => (Condition::Mist, "Reifnebel"),
        51 => (Condition::Drizzle, "Leichter Sprühregen"),
        53 => (Condition::Drizzle, "Sprühregen"),
        55 => (Condition::Drizzle, "Starker Sprühregen"),
        61 => (Condition::Rain, "Leichter Regen"),
        63 => (Condition::Rain, "Regen"),
        65 => (Condition::Rain, "Starker Regen"),
        71 => (Condition::Snow, "Leichter Schneefall"),
        73 => (Condition::Snow, "Schneefall"),
        75 => (Condition::Snow, "Starker Schneefall"),
        95 => (Condition::Thunderstorm, "Gewitter"),
        96 => (Condition::Thunderstorm, "Gewitter mit Hagel"),
        99 => (Condition::Thunderstorm, "Schweres Gewitter mit Hagel"),
        _ => (Condition::Clouds, "Bewölkt"),
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn current(&self, location: &Location) -> Result<WeatherReading, WeatherError> {
        let url = format!("{}/v1/forecast", self.base_url.trim_end_matches('/'));
        debug!(%url, location = %location.name, "requesting Open-Meteo current conditions");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("timezone", "Europe/Berlin".to_string()),
                ("wind_speed_unit", "kmh".to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Api {
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: OmResponse = serde_json::from_str(&body)?;
        let current = parsed.current;
        let (condition, description) = condition_from_wmo(current.weather_code);
        let temperature = current.temperature_2m.round();

        Ok(WeatherReading {
            location: location.name.clone(),
            temperature,
            feels_like: current.apparent_temperature.map_or(temperature, f64::round),
            humidity: round_percent(current.relative_humidity_2m),
            wind_speed: current.wind_speed_10m.round(),
            wind_direction: normalize_degrees(current.wind_direction_10m),
            wind_gust: current.wind_gusts_10m.map(f64::round),
            condition,
            description: description.to_string(),
            timestamp: Utc::now(),
            source: "Open-Meteo".to_string(),
        })
    }
}
