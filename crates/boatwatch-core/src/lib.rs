//! # boatwatch-core - Core Domain Types
//!
//! Foundation crate for BoatWatch. Provides chart geometry, the watch
//! snapshot, event definitions, error handling and the logging bootstrap.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Geometry (`geo`)
//! - [`Fix`] - One position observation with timestamp, accuracy and speed
//! - [`Circle`], [`Polygon`] - Derived geometry carriers
//! - [`SafeSector`] - The safe swinging boundary (circle or wedge)
//! - [`SectorHandle`] - Editable handles of a safe sector
//!
//! ### Snapshot (`state`)
//! - [`WatchState`] - The serializable watch snapshot owned by the monitor
//!
//! ### Events (`events`)
//! - [`WatchEvent`] - Geometry/alarm events fanned out to watchers
//! - [`AlarmKind`] - The two independent alarm channels
//! - [`SamplingHint`] - Adaptive fix-rate hint from the estimator
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with recoverability classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use boatwatch_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod geo;
pub mod logging;
pub mod state;
pub mod units;

/// Prelude for common imports used throughout all BoatWatch crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use events::{
    AlarmKind, SamplingHint, WatchEvent, ACCURACY_ALARM_ACTION, ANCHOR_ALARM_ACTION,
};
pub use geo::{normalize_angle, Circle, Fix, Polygon, SafeSector, SectorHandle};
pub use state::WatchState;
pub use units::{chart_to_meters, feet_from_meters, format_distance, DistanceUnit};
