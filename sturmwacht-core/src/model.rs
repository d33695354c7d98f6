use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named coordinate the weather is fetched for. Missing fields fall back to Berlin-Mitte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn berlin_mitte() -> Self {
        Self {
            name: "Berlin-Mitte".to_string(),
            latitude: 52.52,
            longitude: 13.41,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::berlin_mitte()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
}

impl Condition {
    pub fn emoji(&self, is_day: bool) -> &'static str {
        match self {
            Condition::Clear if is_day => "☀️",
            Condition::Clear => "🌙",
            Condition::Clouds if is_day => "⛅",
            Condition::Clouds => "☁️",
            Condition::Rain => "🌧️",
            Condition::Drizzle => "🌦️",
            Condition::Thunderstorm => "⛈️",
            Condition::Snow => "❄️",
            Condition::Mist | Condition::Fog => "🌫️",
        }
    }
}

/// A single normalized snapshot of current conditions.
///
/// Units: temperatures in °C, wind in km/h, humidity in percent,
/// wind direction in degrees `0..360`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub location: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub wind_direction: u16,
    pub wind_gust: Option<f64>,
    pub condition: Condition,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Moderate,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub level: WarningLevel,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub source: String,
}

/// Wind hazard severity. Ordered: `Normal < Warning < Storm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Normal,
    Warning,
    Storm,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Warning => "warning",
            AlertLevel::Storm => "storm",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAssessment {
    pub work_safety: String,
    pub recommendation: String,
    pub priority: String,
    pub message: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

/// Everything the weather banner needs for one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub weather: WeatherReading,
    pub warnings: Vec<Warning>,
    pub alert_level: AlertLevel,
    pub assessment: BusinessAssessment,
    pub last_updated: DateTime<Utc>,
}
