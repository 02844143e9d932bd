//! # boatwatch-daemon - External-World Adapters
//!
//! Fix sources, the geometry-engine boundary, snapshot persistence and alarm
//! resources. Depends on [`boatwatch_core`] for domain types and error
//! handling.
//!
//! ## Public API
//!
//! ### Geometry Engine Boundary (`estimator`)
//! - [`AnchorEstimator`] - Trait the monitor feeds fixes and edits through
//! - [`EstimatorEvent`] - Engine outputs (geometry, hints, drift alarms)
//! - [`SectorGeometry`] - Pure hit-test/drag math used by the gesture editor
//! - [`RingEstimator`] - Naive built-in estimator for stand-alone runs
//!
//! ### Fix Sources (`source`)
//! - [`FixSource`] - Subscription-based fix delivery
//! - [`AnchorageSimulator`] - Simulated swing around an anchor point
//! - [`StdinSource`] - Line-based live source for headless runs
//!
//! ### Persistence (`persistence`)
//! - [`PersistenceStore`] - Load/save/delete the watch snapshot blob
//!
//! ### Alarm Resources (`sink`)
//! - [`AlarmSink`] - Wake/audio/surface resources held while firing
//! - [`LogAlarmSink`] - Logging-only sink for headless runs

pub mod estimator;
pub mod persistence;
pub mod sink;
pub mod source;

pub use estimator::{
    AnchorEstimator, EstimatorEvent, RingEstimator, SectorGeometry, StandardSectorGeometry,
};
pub use persistence::PersistenceStore;
pub use sink::{AlarmSink, LogAlarmSink};
pub use source::{parse_fix_line, AnchorageConfig, AnchorageSimulator, FixSource, StdinSource};
