//! Business advisory for a given alert level.

use crate::model::{AlertLevel, BusinessAssessment, WeatherReading};

struct Advisory {
    work_safety: &'static str,
    recommendation: &'static str,
    priority: &'static str,
    message: &'static str,
    color: &'static str,
}

const STORM: Advisory = Advisory {
    work_safety: "GEFÄHRLICH",
    recommendation: "Alle Baumarbeiten einstellen",
    priority: "NOTDIENST",
    message: "Sturmschäden-Notdienst aktiviert",
    color: "red",
};

const WARNING: Advisory = Advisory {
    work_safety: "EINGESCHRÄNKT",
    recommendation: "Nur erfahrene Teams, erhöhte Vorsicht",
    priority: "VORSICHT",
    message: "Baumkontrolle empfohlen",
    color: "orange",
};

const NORMAL: Advisory = Advisory {
    work_safety: "OPTIMAL",
    recommendation: "Alle Arbeiten möglich",
    priority: "NORMAL",
    message: "Optimale Arbeitsbedingungen",
    color: "green",
};

pub fn assess(level: AlertLevel, reading: &WeatherReading) -> BusinessAssessment {
    let advisory = match level {
        AlertLevel::Storm => &STORM,
        AlertLevel::Warning => &WARNING,
        AlertLevel::Normal => &NORMAL,
    };

    BusinessAssessment {
        work_safety: advisory.work_safety.to_string(),
        recommendation: advisory.recommendation.to_string(),
        priority: advisory.priority.to_string(),
        message: advisory.message.to_string(),
        color: advisory.color.to_string(),
        additional_info: additional_info(reading).map(str::to_string),
    }
}

// First match wins.
fn additional_info(reading: &WeatherReading) -> Option<&'static str> {
    if reading.temperature < 0.0 {
        Some("Frostgefahr - Rutschgefahr beachten")
    } else if reading.temperature > 30.0 {
        Some("Hitze - Häufige Pausen einplanen")
    } else if reading.humidity > 85 {
        Some("Hohe Luftfeuchtigkeit - Rutschgefahr")
    } else {
        None
    }
}
