//! Watch snapshot persistence.
//!
//! One JSON blob per install, written on normal stop and deleted on a
//! forget-stop. A missing or unreadable snapshot is never fatal; the monitor
//! falls back to a fresh state.

use std::fs;
use std::path::PathBuf;

use boatwatch_core::prelude::*;
use boatwatch_core::WatchState;

const SNAPSHOT_FILENAME: &str = "anchorwatch.json";

/// Load/save/delete the persisted [`WatchState`] snapshot
#[derive(Debug, Clone)]
pub struct PersistenceStore {
    dir: PathBuf,
}

impl PersistenceStore {
    /// Store under the platform data directory (`~/.local/share/boatwatch`)
    pub fn new() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            dir: base.join("boatwatch"),
        }
    }

    /// Store under an explicit directory (tests, custom installs)
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILENAME)
    }

    /// Read the snapshot, or `None` when absent or unreadable.
    ///
    /// Corrupt snapshots are logged and treated as absent.
    pub fn load(&self) -> Option<WatchState> {
        let path = self.path();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no snapshot at {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("failed to read snapshot {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_slice::<WatchState>(&data) {
            Ok(state) => {
                info!("restored snapshot from {}", path.display());
                Some(state)
            }
            Err(e) => {
                warn!("corrupt snapshot {}: {e}", path.display());
                None
            }
        }
    }

    /// Write the snapshot atomically (temp file + rename in the same dir)
    pub fn save(&self, state: &WatchState) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(state)?;
        fs::write(&tmp, data).map_err(|e| Error::SnapshotWrite {
            path: tmp.clone(),
            reason: e.to_string(),
        })?;
        fs::rename(&tmp, &path).map_err(|e| Error::SnapshotWrite {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        info!("wrote snapshot to {}", path.display());
        Ok(())
    }

    /// Remove the snapshot. Removing an absent snapshot is a no-op.
    pub fn delete(&self) -> Result<()> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("deleted snapshot {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for PersistenceStore {
    fn default() -> Self {
        Self::new()
    }
}
