//! Adaptive fix-request-rate control.
//!
//! The estimator suggests how long the fix source may sleep; this module
//! clamps the suggestion and decides whether re-registering with the source
//! is worth it. Small oscillations in the hint must not cause subscription
//! churn.

use std::time::Duration;

use boatwatch_core::prelude::*;
use boatwatch_core::SamplingHint;

/// Re-register only when the interval moved by more than this
const REREGISTER_THRESHOLD: Duration = Duration::from_millis(1000);

/// Outcome of clamping one hint against the previous interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPlan {
    /// Clamped sleep interval, `0 <= interval <= max_interval`
    pub interval: Duration,
    /// Minimum movement in meters before a new fix matters
    pub min_distance_m: f64,
    /// Whether the fix source should be re-registered
    pub reregister: bool,
}

/// Pure hint→plan function.
///
/// NaN or sub-second suggestions mean "request continuously" (zero);
/// infinite or over-max suggestions clamp to `max_interval`. Re-registration
/// fires iff the interval moved by more than one second in either direction.
pub fn plan(hint: SamplingHint, last_interval: Duration, max_interval: Duration) -> SamplingPlan {
    let interval = if hint.seconds.is_nan() || hint.seconds < 1.0 {
        Duration::ZERO
    } else if hint.seconds >= max_interval.as_secs_f64() {
        // Covers infinity and anything Duration::from_secs_f64 would choke on
        max_interval
    } else {
        Duration::from_secs_f64(hint.seconds)
    };

    let min_distance_m = if hint.meters.is_finite() && hint.meters > 0.0 {
        hint.meters
    } else {
        0.0
    };

    let delta = if interval >= last_interval {
        interval - last_interval
    } else {
        last_interval - interval
    };

    SamplingPlan {
        interval,
        min_distance_m,
        reregister: delta > REREGISTER_THRESHOLD,
    }
}

/// Stateful wrapper holding the last applied interval
#[derive(Debug)]
pub struct SamplingController {
    last_interval: Duration,
    max_interval: Duration,
}

impl SamplingController {
    pub fn new(max_interval: Duration) -> Self {
        Self {
            last_interval: Duration::ZERO,
            max_interval,
        }
    }

    pub fn last_interval(&self) -> Duration {
        self.last_interval
    }

    pub fn set_max_interval(&mut self, max_interval: Duration) {
        self.max_interval = max_interval;
    }

    /// Forget the applied interval, e.g. after the source was swapped
    pub fn reset(&mut self) {
        self.last_interval = Duration::ZERO;
    }

    /// Consume one hint. Returns the new `(interval, min_distance_m)` when
    /// the source should be re-registered, `None` on a no-op.
    pub fn on_hint(&mut self, hint: SamplingHint) -> Option<(Duration, f64)> {
        let plan = plan(hint, self.last_interval, self.max_interval);
        if plan.reregister {
            debug!(
                from_ms = self.last_interval.as_millis() as u64,
                to_ms = plan.interval.as_millis() as u64,
                "fix source re-registration"
            );
            self.last_interval = plan.interval;
            Some((plan.interval, plan.min_distance_m))
        } else {
            None
        }
    }
}
