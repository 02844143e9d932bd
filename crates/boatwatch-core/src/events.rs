//! Domain event definitions

use serde::{Deserialize, Serialize};

use crate::geo::{Circle, Fix, Polygon, SafeSector};

/// Action identifier used to surface the drift alarm acknowledgment UI
pub const ANCHOR_ALARM_ACTION: &str = "boatwatch.alarm.anchor";
/// Action identifier used to surface the accuracy alarm acknowledgment UI
pub const ACCURACY_ALARM_ACTION: &str = "boatwatch.alarm.accuracy";

/// The two independent alarm channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlarmKind {
    /// Current position fell outside the safe sector
    Drift,
    /// No sufficiently accurate fix arrived within the configured timeout
    Accuracy,
}

impl AlarmKind {
    /// The acknowledgment-surface action identifier for this channel
    pub fn action(&self) -> &'static str {
        match self {
            AlarmKind::Drift => ANCHOR_ALARM_ACTION,
            AlarmKind::Accuracy => ACCURACY_ALARM_ACTION,
        }
    }

    /// Resolve a channel from its action identifier
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            ANCHOR_ALARM_ACTION => Some(AlarmKind::Drift),
            ACCURACY_ALARM_ACTION => Some(AlarmKind::Accuracy),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlarmKind::Drift => write!(f, "drift"),
            AlarmKind::Accuracy => write!(f, "accuracy"),
        }
    }
}

/// Adaptive sampling hint produced by the estimator after an update.
///
/// Values come straight from the engine and may be NaN or infinite;
/// consumers are expected to clamp.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingHint {
    /// Suggested seconds until the next fix is needed
    pub seconds: f64,
    /// Suggested minimum movement in meters before a new fix matters
    pub meters: f64,
}

impl SamplingHint {
    pub fn new(seconds: f64, meters: f64) -> Self {
        Self { seconds, meters }
    }
}

/// Geometry/alarm event fanned out to every registered watcher
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// Echo of the latest accepted fix
    Location(Fix),
    /// Convex area covered by the accumulated fixes
    Area(Polygon),
    /// Outer path of the used area
    OuterPath(Polygon),
    /// Estimated anchoring circle
    EstimatedCircle(Circle),
    /// Current safe sector boundary
    SafeSector(SafeSector),
    /// An alarm channel started firing
    Alarm {
        kind: AlarmKind,
        /// Distance beyond the boundary in chart units (drift only)
        distance: f64,
    },
}

impl WatchEvent {
    /// Short label for logging
    pub fn kind_str(&self) -> &'static str {
        match self {
            WatchEvent::Location(_) => "location",
            WatchEvent::Area(_) => "area",
            WatchEvent::OuterPath(_) => "outerPath",
            WatchEvent::EstimatedCircle(_) => "estimatedCircle",
            WatchEvent::SafeSector(_) => "safeSector",
            WatchEvent::Alarm { .. } => "alarm",
        }
    }
}
