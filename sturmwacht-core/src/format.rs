//! Display helpers for the weather banner.

const COMPASS: [&str; 16] = [
    "N", "NNO", "NO", "ONO", "O", "OSO", "SO", "SSO", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// German 16-point compass label for a wind direction in degrees.
pub fn wind_direction_label(degrees: f64) -> &'static str {
    let index = ((degrees / 22.5).round() as i64).rem_euclid(16) as usize;
    COMPASS[index]
}
