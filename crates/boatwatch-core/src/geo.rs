//! Chart geometry for the anchor watch.
//!
//! Coordinates are chart units (longitude/latitude degrees). Angles are
//! radians, measured counter-clockwise from east, normalized to `[0, 2π)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::f64::consts::TAU;

/// One reported position observation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    /// Longitude in degrees
    pub x: f64,
    /// Latitude in degrees
    pub y: f64,
    pub time: DateTime<Utc>,
    /// Estimated accuracy in meters
    pub accuracy: f64,
    /// Speed over ground in m/s, when the source reports it
    #[serde(default)]
    pub speed: Option<f64>,
}

impl Fix {
    pub fn new(x: f64, y: f64, time: DateTime<Utc>, accuracy: f64) -> Self {
        Self {
            x,
            y,
            time,
            accuracy,
            speed: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// A circle in chart coordinates
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Circle {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    pub fn distance_from_center(&self, x: f64, y: f64) -> f64 {
        (x - self.x).hypot(y - self.y)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.distance_from_center(x, y) <= self.radius
    }
}

/// Point list carrier for the fix area polygon and the outer path
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Polygon {
    pub points: Vec<(f64, f64)>,
}

impl Polygon {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Normalize an angle to `[0, 2π)`
pub fn normalize_angle(a: f64) -> f64 {
    let a = a % TAU;
    if a < 0.0 {
        a + TAU
    } else {
        a
    }
}

/// Editable handles of a [`SafeSector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SectorHandle {
    /// Drag the whole sector to a new center
    Move,
    /// Drag the radius marker on the rim
    Radius,
    LeftAngle,
    RightAngle,
}

/// The boundary beyond which the vessel is considered adrift.
///
/// Either a full circle (`full_circle`) or a pie wedge spanning
/// counter-clockwise from `right_angle` to `left_angle`. Snapshots are
/// immutable; edits produce a new value that supersedes the prior one.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeSector {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub left_angle: f64,
    pub right_angle: f64,
    pub full_circle: bool,
}

impl SafeSector {
    /// A full-circle sector with no angular restriction
    pub fn circle(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            radius,
            left_angle: 0.0,
            right_angle: 0.0,
            full_circle: true,
        }
    }

    /// A wedge spanning counter-clockwise from `right_angle` to `left_angle`
    pub fn wedge(x: f64, y: f64, radius: f64, left_angle: f64, right_angle: f64) -> Self {
        Self {
            x,
            y,
            radius,
            left_angle: normalize_angle(left_angle),
            right_angle: normalize_angle(right_angle),
            full_circle: false,
        }
    }

    pub fn as_circle(&self) -> Circle {
        Circle::new(self.x, self.y, self.radius)
    }

    /// Angular width of the wedge in radians (`2π` for a full circle)
    pub fn sweep(&self) -> f64 {
        if self.full_circle {
            TAU
        } else {
            let sweep = normalize_angle(self.left_angle - self.right_angle);
            if sweep == 0.0 {
                TAU
            } else {
                sweep
            }
        }
    }

    /// Whether a position lies inside the safe boundary
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let dist = (x - self.x).hypot(y - self.y);
        if dist > self.radius {
            return false;
        }
        if self.full_circle {
            return true;
        }
        let bearing = normalize_angle((y - self.y).atan2(x - self.x));
        normalize_angle(bearing - self.right_angle) <= self.sweep()
    }

    /// How far a position is beyond the boundary, in chart units.
    /// Zero when inside.
    pub fn distance_outside(&self, x: f64, y: f64) -> f64 {
        if self.contains(x, y) {
            0.0
        } else {
            let dist = (x - self.x).hypot(y - self.y);
            (dist - self.radius).max(0.0)
        }
    }

    /// Position of one editing handle in chart coordinates.
    ///
    /// The radius handle sits on the rim at angle zero, matching the radius
    /// marker line the chart draws. Angle handles sit on the rim at their
    /// angles and only exist for wedge sectors.
    pub fn handle_position(&self, handle: SectorHandle) -> Option<(f64, f64)> {
        match handle {
            SectorHandle::Move => Some((self.x, self.y)),
            SectorHandle::Radius => Some((self.x + self.radius, self.y)),
            SectorHandle::LeftAngle if !self.full_circle => Some((
                self.x + self.radius * self.left_angle.cos(),
                self.y + self.radius * self.left_angle.sin(),
            )),
            SectorHandle::RightAngle if !self.full_circle => Some((
                self.x + self.radius * self.right_angle.cos(),
                self.y + self.radius * self.right_angle.sin(),
            )),
            _ => None,
        }
    }

    /// All handles this sector exposes, with their positions
    pub fn handles(&self) -> Vec<(SectorHandle, (f64, f64))> {
        [
            SectorHandle::Move,
            SectorHandle::Radius,
            SectorHandle::LeftAngle,
            SectorHandle::RightAngle,
        ]
        .into_iter()
        .filter_map(|h| self.handle_position(h).map(|p| (h, p)))
        .collect()
    }
}
