//! Geometry engine boundary.
//!
//! The production fitting engine (convex hull, iterative circle fit, sector
//! math) lives outside this codebase and is consumed strictly through
//! [`AnchorEstimator`]. [`RingEstimator`] is a deliberately naive built-in
//! implementation of the same contract so the daemon can run stand-alone.

use boatwatch_core::prelude::*;
use boatwatch_core::{
    chart_to_meters, normalize_angle, Circle, Fix, Polygon, SafeSector, SamplingHint,
    SectorHandle, WatchState,
};

use std::f64::consts::TAU;

/// Output of one estimator update, in the order the engine produced them
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorEvent {
    Location(Fix),
    Area(Polygon),
    OuterPath(Polygon),
    Estimated(Circle),
    Safe(SafeSector),
    Hint(SamplingHint),
    /// The fix fell outside the safe sector by `distance` chart units
    Alarm { distance: f64 },
}

/// The geometry engine surface the monitor talks to.
///
/// All mutating calls happen on the monitor's writer task; `drag_handle` is
/// pure and may be called from the UI side during live edits.
pub trait AnchorEstimator: Send {
    /// Feed one accepted fix and collect the resulting geometry updates
    fn update(&mut self, fix: &Fix) -> Vec<EstimatorEvent>;

    /// Recompute a single handle of the sector during a live drag
    fn drag_handle(&self, sector: &SafeSector, handle: SectorHandle, x: f64, y: f64)
        -> SafeSector;

    /// Reconcile and adopt a manually edited sector (minimum radius, angle
    /// ordering). Returns the validated snapshot.
    fn commit_sector(&mut self, sector: SafeSector) -> SafeSector;

    /// Discard all accumulated state
    fn reset(&mut self);

    /// Current serializable snapshot
    fn snapshot(&self) -> WatchState;

    /// Replace the internal state with a previously persisted snapshot
    fn restore(&mut self, state: &WatchState);
}

// ─────────────────────────────────────────────────────────────────────────────
// Sector geometry
// ─────────────────────────────────────────────────────────────────────────────

/// Pure sector math shared between the editor (UI side) and the estimator.
///
/// Split out of [`AnchorEstimator`] so gesture handling never has to borrow
/// the writer-owned estimator: hit-testing and live drags touch no state.
pub trait SectorGeometry: Send + Sync {
    /// Which handle, if any, a touch at `(x, y)` grabs within `hit_radius`
    fn hit_test(
        &self,
        sector: &SafeSector,
        x: f64,
        y: f64,
        hit_radius: f64,
    ) -> Option<SectorHandle>;

    /// Recompute a single handle of the sector during a live drag
    fn drag_handle(&self, sector: &SafeSector, handle: SectorHandle, x: f64, y: f64)
        -> SafeSector;
}

/// The stock sector math: nearest-handle hit-testing, per-handle drags
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSectorGeometry;

impl SectorGeometry for StandardSectorGeometry {
    fn hit_test(
        &self,
        sector: &SafeSector,
        x: f64,
        y: f64,
        hit_radius: f64,
    ) -> Option<SectorHandle> {
        sector
            .handles()
            .into_iter()
            .map(|(handle, (hx, hy))| (handle, (hx - x).hypot(hy - y)))
            .filter(|(_, dist)| *dist <= hit_radius)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(handle, _)| handle)
    }

    fn drag_handle(
        &self,
        sector: &SafeSector,
        handle: SectorHandle,
        x: f64,
        y: f64,
    ) -> SafeSector {
        let mut next = *sector;
        match handle {
            SectorHandle::Move => {
                next.x = x;
                next.y = y;
            }
            SectorHandle::Radius => {
                next.radius = (x - sector.x).hypot(y - sector.y).max(f64::EPSILON);
            }
            SectorHandle::LeftAngle => {
                next.left_angle = normalize_angle((y - sector.y).atan2(x - sector.x));
                next.full_circle = false;
            }
            SectorHandle::RightAngle => {
                next.right_angle = normalize_angle((y - sector.y).atan2(x - sector.x));
                next.full_circle = false;
            }
        }
        next
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RingEstimator
// ─────────────────────────────────────────────────────────────────────────────

/// Fixes kept for the centroid estimate
const MAX_FIXES: usize = 1024;

/// Updates considered the learning phase, polled at full rate
const WARMUP_FIXES: usize = 16;

/// Safety margin applied to the observed swing spread
const SAFETY_FACTOR: f64 = 1.5;

/// Naive anchoring estimator: centroid center, max-spread radius.
///
/// Not a substitute for the external fitting engine. It exists so the daemon
/// has a working estimator when run stand-alone and so the boundary contract
/// has an executable reference.
pub struct RingEstimator {
    state: WatchState,
    /// Minimum safe-sector radius in chart units
    min_radius: f64,
}

impl RingEstimator {
    /// Minimum radius of 15 meters expressed in chart units
    pub const DEFAULT_MIN_RADIUS_M: f64 = 15.0;

    pub fn new() -> Self {
        Self::with_min_radius_m(Self::DEFAULT_MIN_RADIUS_M)
    }

    pub fn with_min_radius_m(min_radius_m: f64) -> Self {
        Self {
            state: WatchState::default(),
            min_radius: min_radius_m / chart_to_meters(1.0),
        }
    }

    fn centroid(&self) -> Option<(f64, f64)> {
        if self.state.fixes.is_empty() {
            return None;
        }
        let n = self.state.fixes.len() as f64;
        let (sx, sy) = self
            .state
            .fixes
            .iter()
            .fold((0.0, 0.0), |(sx, sy), f| (sx + f.x, sy + f.y));
        Some((sx / n, sy / n))
    }

    fn max_spread(&self, cx: f64, cy: f64) -> f64 {
        self.state
            .fixes
            .iter()
            .map(|f| (f.x - cx).hypot(f.y - cy))
            .fold(0.0, f64::max)
    }

    fn hint_after(&self, fix: &Fix) -> SamplingHint {
        if self.state.fixes.len() < WARMUP_FIXES {
            return SamplingHint::new(1.0, 1.0);
        }
        let Some(safe) = &self.state.safe else {
            return SamplingHint::new(1.0, 1.0);
        };
        // Time to reach the boundary at the current speed, floor 1 m/s
        let margin_m =
            chart_to_meters((safe.radius - safe.as_circle().distance_from_center(fix.x, fix.y)).max(0.0));
        let speed = fix.speed.unwrap_or(0.0).max(1.0);
        let seconds = (margin_m / speed).clamp(1.0, 600.0);
        SamplingHint::new(seconds, (margin_m / 4.0).max(1.0))
    }
}

impl Default for RingEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl AnchorEstimator for RingEstimator {
    fn update(&mut self, fix: &Fix) -> Vec<EstimatorEvent> {
        self.state.fixes.push(*fix);
        if self.state.fixes.len() > MAX_FIXES {
            self.state.fixes.remove(0);
        }

        let mut events = vec![EstimatorEvent::Location(*fix)];

        let (cx, cy) = self.centroid().expect("at least one fix");
        let spread = self.max_spread(cx, cy);
        let estimated = Circle::new(cx, cy, spread);
        self.state.estimated = Some(estimated);
        events.push(EstimatorEvent::Estimated(estimated));

        // A manual override pins the sector; automatic estimation resumes
        // only after a reset.
        if !self.state.manual_sector {
            let radius = (spread * SAFETY_FACTOR).max(self.min_radius);
            let safe = SafeSector::circle(cx, cy, radius);
            self.state.safe = Some(safe);
            events.push(EstimatorEvent::Safe(safe));
        }

        if let Some(safe) = &self.state.safe {
            let outside = safe.distance_outside(fix.x, fix.y);
            if outside > 0.0 {
                events.push(EstimatorEvent::Alarm { distance: outside });
            }
        }

        events.push(EstimatorEvent::Hint(self.hint_after(fix)));
        events
    }

    fn drag_handle(
        &self,
        sector: &SafeSector,
        handle: SectorHandle,
        x: f64,
        y: f64,
    ) -> SafeSector {
        StandardSectorGeometry.drag_handle(sector, handle, x, y)
    }

    fn commit_sector(&mut self, sector: SafeSector) -> SafeSector {
        let mut safe = sector;
        safe.radius = safe.radius.max(self.min_radius);
        safe.left_angle = normalize_angle(safe.left_angle);
        safe.right_angle = normalize_angle(safe.right_angle);
        // Angles collapsing onto each other mean no restriction is left
        if !safe.full_circle {
            let sweep = normalize_angle(safe.left_angle - safe.right_angle);
            if sweep < 1e-9 || (TAU - sweep) < 1e-9 {
                safe = SafeSector::circle(safe.x, safe.y, safe.radius);
            }
        }
        self.state.safe = Some(safe);
        self.state.manual_sector = true;
        debug!(radius = safe.radius, full_circle = safe.full_circle, "sector committed");
        safe
    }

    fn reset(&mut self) {
        self.state.clear();
    }

    fn snapshot(&self) -> WatchState {
        self.state.clone()
    }

    fn restore(&mut self, state: &WatchState) {
        self.state = state.clone();
    }
}
