//! Distance display units and chart-scale conversion

use serde::{Deserialize, Serialize};

/// Meters per degree of latitude (one nautical mile per minute of arc)
const METERS_PER_DEGREE: f64 = 60.0 * 1852.0;

const FEET_PER_METER: f64 = 3.280_839_895_013_123;

/// Unit used when presenting distances to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Meters,
    Feet,
}

impl DistanceUnit {
    /// Parse the preference value (`"m"` / `"ft"`)
    pub fn from_pref(value: &str) -> Option<Self> {
        match value {
            "m" => Some(DistanceUnit::Meters),
            "ft" => Some(DistanceUnit::Feet),
            _ => None,
        }
    }

    pub fn as_pref(&self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Feet => "ft",
        }
    }
}

impl std::fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_pref())
    }
}

/// Convert a chart-unit distance (degrees) to meters
pub fn chart_to_meters(distance: f64) -> f64 {
    distance * METERS_PER_DEGREE
}

pub fn feet_from_meters(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

/// Format a chart-unit distance for display, e.g. `"42 m"` / `"138 ft"`
pub fn format_distance(chart_distance: f64, unit: DistanceUnit) -> String {
    let meters = chart_to_meters(chart_distance);
    match unit {
        DistanceUnit::Meters => format!("{:.0} m", meters),
        DistanceUnit::Feet => format!("{:.0} ft", feet_from_meters(meters)),
    }
}
