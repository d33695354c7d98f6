use chrono::{Local, Timelike};
use std::fmt::Write;
use sturmwacht_core::{AlertLevel, WeatherReport, format::wind_direction_label};

/// Plain-text weather banner, one fact per line.
pub fn banner(report: &WeatherReport) -> String {
    let w = &report.weather;
    let local = report.last_updated.with_timezone(&Local);
    let is_day = (7..20).contains(&local.hour());
    let mut out = String::new();

    let _ = writeln!(out, "{} {} · {}", w.condition.emoji(is_day), w.location, w.description);
    let _ = writeln!(
        out,
        "  Temperatur:   {:.0} °C (gefühlt {:.0} °C)",
        w.temperature, w.feels_like
    );
    let _ = writeln!(out, "  Luftfeuchte:  {} %", w.humidity);

    let gust = match w.wind_gust {
        Some(g) => format!(", Böen {g:.0} km/h"),
        None => String::new(),
    };
    let _ = writeln!(
        out,
        "  Wind:         {:.0} km/h aus {}{gust}",
        w.wind_speed,
        wind_direction_label(f64::from(w.wind_direction)),
    );

    let a = &report.assessment;
    let _ = writeln!(out, "  Alarmstufe:   {} ({})", alert_label(report.alert_level), a.priority);
    let _ = writeln!(out, "  Arbeiten:     {} - {}", a.work_safety, a.recommendation);
    let _ = writeln!(out, "  Hinweis:      {}", a.message);
    if let Some(info) = &a.additional_info {
        let _ = writeln!(out, "  Zusatz:       {info}");
    }

    for warning in &report.warnings {
        let _ = writeln!(
            out,
            "  ⚠ {}: {} (bis {})",
            warning.title,
            warning.description,
            warning.valid_until.with_timezone(&Local).format("%H:%M"),
        );
    }

    let _ = writeln!(out, "  Quelle: {}, Stand {}", w.source, local.format("%d.%m.%Y %H:%M"));
    out
}

fn alert_label(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Normal => "NORMAL",
        AlertLevel::Warning => "WARNUNG",
        AlertLevel::Storm => "STURM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sturmwacht_core::{Condition, WeatherReading, assess, classify, derive_warnings};

    fn report(wind_speed: f64, wind_gust: Option<f64>, temperature: f64) -> WeatherReport {
        let now = Utc::now();
        let weather = WeatherReading {
            location: "Berlin-Mitte".into(),
            temperature,
            feels_like: temperature - 4.0,
            humidity: 70,
            wind_speed,
            wind_direction: 225,
            wind_gust,
            condition: Condition::Rain,
            description: "Regen".into(),
            timestamp: now,
            source: "Open-Meteo".into(),
        };
        let warnings = derive_warnings(&weather, now);
        let alert_level = classify(&weather, &warnings);
        let assessment = assess(alert_level, &weather);
        WeatherReport {
            weather,
            warnings,
            alert_level,
            assessment,
            last_updated: now,
        }
    }

    #[test]
    fn storm_banner_shows_emergency_and_warning() {
        let text = banner(&report(65.0, Some(70.0), 5.0));

        assert!(text.contains("STURM (NOTDIENST)"));
        assert!(text.contains("GEFÄHRLICH"));
        assert!(text.contains("65 km/h aus SW, Böen 70 km/h"));
        assert!(text.contains("⚠ Schwere Sturmwarnung"));
    }

    #[test]
    fn calm_banner_has_no_warning_lines() {
        let text = banner(&report(8.0, None, 35.0));

        assert!(text.contains("NORMAL (NORMAL)"));
        assert!(text.contains("Zusatz:       Hitze - Häufige Pausen einplanen"));
        assert!(!text.contains('⚠'));
        assert!(!text.contains("Böen"));
    }
}
