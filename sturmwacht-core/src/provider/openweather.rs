use async_trait::async_trait;
use chrono::{DateTime, Utc};
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

use super::open_meteo::condition_from_wmo;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
const MPS_TO_KMH: f64 = 3.6;

/// Keyed provider backed by the OpenWeatherMap current-weather endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, WeatherError> {
        Ok(Self {
            api_key,
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
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
    gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

fn condition_from_group(group: &str) -> Condition {
    match group.to_lowercase().as_str() {
        "clear" => Condition::Clear,
        "rain" => Condition::Rain,
        "drizzle" => Condition::Drizzle,
        "thunderstorm" => Condition::Thunderstorm,
        "snow" => Condition::Snow,
        "mist" | "haze" | "smoke" | "dust" => Condition::Mist,
        "fog" => Condition::Fog,
        _ => Condition::Clouds,
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    async fn current(&self, location: &Location) -> Result<WeatherReading, WeatherError> {
        let url = format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'));
        debug!(%url, location = %location.name, "requesting OpenWeather current conditions");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
                ("lang", "de".to_string()),
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

        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;

        let (condition, description) = match parsed.weather.first() {
            Some(w) => (condition_from_group(&w.main), w.description.clone()),
            None => {
                let (condition, label) = condition_from_wmo(3);
                (condition, label.to_string())
            }
        };

        Ok(WeatherReading {
            location: location.name.clone(),
            temperature: parsed.main.temp.round(),
            feels_like: parsed.main.feels_like.round(),
            humidity: round_percent(parsed.main.humidity),
            wind_speed: (parsed.wind.speed * MPS_TO_KMH).round(),
            wind_direction: normalize_degrees(parsed.wind.deg),
            wind_gust: parsed.wind.gust.map(|g| (g * MPS_TO_KMH).round()),
            condition,
            description,
            timestamp: DateTime::from_timestamp(parsed.dt, 0).unwrap_or_else(Utc::now),
            source: "OpenWeatherMap".to_string(),
        })
    }
}
