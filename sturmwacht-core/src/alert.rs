//! Wind alert classification.

use chrono::{DateTime, Duration, Utc};

use crate::model::{AlertLevel, Warning, WarningLevel, WeatherReading};

pub const STORM_WIND_KMH: f64 = 50.0;
pub const STORM_GUST_KMH: f64 = 60.0;
pub const WARNING_WIND_KMH: f64 = 30.0;
pub const WARNING_GUST_KMH: f64 = 40.0;

const SEVERE_WARNING_WIND_KMH: f64 = 60.0;
const MODERATE_WARNING_WIND_KMH: f64 = 40.0;

/// Maps a reading plus any official warnings onto an alert level.
///
/// A missing gust never escalates; it is not read as zero.
pub fn classify(reading: &WeatherReading, warnings: &[Warning]) -> AlertLevel {
    let gust_above = |limit: f64| reading.wind_gust.is_some_and(|gust| gust > limit);
    let has_warning = |level: WarningLevel| warnings.iter().any(|w| w.level == level);

    if has_warning(WarningLevel::Severe)
        || reading.wind_speed > STORM_WIND_KMH
        || gust_above(STORM_GUST_KMH)
    {
        return AlertLevel::Storm;
    }

    if has_warning(WarningLevel::Moderate)
        || reading.wind_speed > WARNING_WIND_KMH
        || gust_above(WARNING_GUST_KMH)
    {
        return AlertLevel::Warning;
    }

    AlertLevel::Normal
}

/// Derives DWD-style wind warnings from the sustained wind speed of a reading.
///
/// At most one warning is produced per reading.
pub fn derive_warnings(reading: &WeatherReading, now: DateTime<Utc>) -> Vec<Warning> {
    let peak = reading.wind_gust.unwrap_or(reading.wind_speed);

    let (level, kind, title, description, valid_for) =
        if reading.wind_speed > SEVERE_WARNING_WIND_KMH {
            (
                WarningLevel::Severe,
                "storm",
                "Schwere Sturmwarnung",
                format!("Orkanböen bis {peak} km/h erwartet"),
                Duration::hours(6),
            )
        } else if reading.wind_speed > MODERATE_WARNING_WIND_KMH {
            (
                WarningLevel::Moderate,
                "wind",
                "Sturmwarnung",
                format!("Starke Windböen bis {peak} km/h"),
                Duration::hours(4),
            )
        } else {
            return Vec::new();
        };

    vec![Warning {
        level,
        kind: kind.to_string(),
        title: title.to_string(),
        description,
        valid_from: now,
        valid_until: now + valid_for,
        source: "DWD".to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;

    fn reading(wind_speed: f64, wind_gust: Option<f64>) -> WeatherReading {
        WeatherReading {
            location: "Berlin-Mitte".into(),
            temperature: 12.0,
            feels_like: 12.0,
            humidity: 60,
            wind_speed,
            wind_direction: 270,
            wind_gust,
            condition: Condition::Clouds,
            description: "Bewölkt".into(),
            timestamp: Utc::now(),
            source: "test".into(),
        }
    }

    fn warning(level: WarningLevel) -> Warning {
        let now = Utc::now();
        Warning {
            level,
            kind: "wind".into(),
            title: String::new(),
            description: String::new(),
            valid_from: now,
            valid_until: now,
            source: "DWD".into(),
        }
    }

    #[test]
    fn strong_wind_is_storm_regardless_of_other_conditions() {
        for speed in [50.5, 51.0, 80.0, 150.0] {
            let mut r = reading(speed, None);
            r.temperature = -15.0;
            r.humidity = 100;
            assert_eq!(classify(&r, &[]), AlertLevel::Storm, "speed {speed}");
        }
    }

    #[test]
    fn strong_gust_alone_is_storm() {
        assert_eq!(classify(&reading(10.0, Some(61.0)), &[]), AlertLevel::Storm);
    }

    #[test]
    fn moderate_wind_is_warning() {
        for speed in [30.5, 40.0, 50.0] {
            assert_eq!(classify(&reading(speed, None), &[]), AlertLevel::Warning, "speed {speed}");
        }
    }

    #[test]
    fn moderate_gust_alone_is_warning() {
        assert_eq!(classify(&reading(5.0, Some(45.0)), &[]), AlertLevel::Warning);
        assert_eq!(classify(&reading(5.0, Some(60.0)), &[]), AlertLevel::Warning);
    }

    #[test]
    fn calm_wind_is_normal() {
        for speed in [0.0, 12.0, 30.0] {
            assert_eq!(classify(&reading(speed, None), &[]), AlertLevel::Normal, "speed {speed}");
        }
        assert_eq!(classify(&reading(30.0, Some(40.0)), &[]), AlertLevel::Normal);
    }

    #[test]
    fn missing_gust_does_not_escalate() {
        assert_eq!(classify(&reading(20.0, None), &[]), AlertLevel::Normal);
    }

    #[test]
    fn warnings_escalate_calm_readings() {
        let calm = reading(5.0, None);
        assert_eq!(classify(&calm, &[warning(WarningLevel::Moderate)]), AlertLevel::Warning);
        assert_eq!(classify(&calm, &[warning(WarningLevel::Severe)]), AlertLevel::Storm);

        let both = [
            warning(WarningLevel::Moderate),
            warning(WarningLevel::Severe),
        ];
        assert_eq!(classify(&calm, &both), AlertLevel::Storm);
    }

    #[test]
    fn moderate_warning_never_downgrades_storm_wind() {
        let gale = reading(70.0, None);
        assert_eq!(classify(&gale, &[warning(WarningLevel::Moderate)]), AlertLevel::Storm);
    }

    #[test]
    fn level_is_monotonic_in_wind_speed() {
        let mut previous = AlertLevel::Normal;
        for tenth in 0..1000 {
            let level = classify(&reading(f64::from(tenth) / 10.0, None), &[]);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn no_warning_below_forty() {
        assert!(derive_warnings(&reading(40.0, Some(55.0)), Utc::now()).is_empty());
    }

    #[test]
    fn moderate_warning_quotes_gust() {
        let now = Utc::now();
        let warnings = derive_warnings(&reading(45.0, Some(58.0)), now);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarningLevel::Moderate);
        assert_eq!(warnings[0].kind, "wind");
        assert_eq!(warnings[0].description, "Starke Windböen bis 58 km/h");
        assert_eq!(warnings[0].valid_until - now, Duration::hours(4));
    }

    #[test]
    fn severe_warning_falls_back_to_wind_speed() {
        let now = Utc::now();
        let warnings = derive_warnings(&reading(65.0, None), now);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarningLevel::Severe);
        assert_eq!(warnings[0].title, "Schwere Sturmwarnung");
        assert_eq!(warnings[0].description, "Orkanböen bis 65 km/h erwartet");
        assert_eq!(warnings[0].valid_until - now, Duration::hours(6));
    }
}
