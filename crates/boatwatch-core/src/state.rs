//! The persisted watch snapshot

use serde::{Deserialize, Serialize};

use crate::geo::{Circle, Fix, SafeSector};

/// Serializable snapshot of accumulated fixes and derived geometry.
///
/// Exclusively owned by the monitor service: created fresh on first run or on
/// explicit reset, replaced atomically on each accepted fix or manual edit,
/// persisted on normal stop and deleted on a forget-stop. Everything else
/// only ever sees immutable copies.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchState {
    /// Accepted fixes, oldest first
    #[serde(default)]
    pub fixes: Vec<Fix>,

    /// Latest estimated anchoring circle
    #[serde(default)]
    pub estimated: Option<Circle>,

    /// Latest safe sector boundary
    #[serde(default)]
    pub safe: Option<SafeSector>,

    /// Whether the safe sector was manually overridden by the user
    #[serde(default)]
    pub manual_sector: bool,
}

impl WatchState {
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty() && self.estimated.is_none() && self.safe.is_none()
    }

    /// Clear to the fresh-start state
    pub fn clear(&mut self) {
        *self = WatchState::default();
    }
}
