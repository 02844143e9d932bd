//! Multi-pointer safe-sector editing.
//!
//! Translates raw pointer input into geometry edit commands. Each active
//! pointer owns at most one [`Cursor`] bound to one sector handle; cursors
//! for distinct pointers never interact. Pointer events with no matching
//! cursor are ignored.

use std::collections::HashMap;

use boatwatch_core::prelude::*;
use boatwatch_core::{SafeSector, SectorHandle};
use boatwatch_daemon::SectorGeometry;

/// Pointer identifier as reported by the input surface
pub type PointerId = u32;

/// Live per-pointer editing state
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub handle: SectorHandle,
    /// Offset from the touch point to the handle, captured at touch-down,
    /// so the handle does not jump under the finger.
    grab_dx: f64,
    grab_dy: f64,
}

/// What the UI adapter should forward to the monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorAction {
    /// Live snapshot during a drag; publish without validation
    Preview(SafeSector),
    /// Final value on release; run engine reconciliation, then publish
    Commit(SafeSector),
}

/// Gesture state machine for manual boundary editing.
///
/// Runs on the UI's own event loop; the emitted [`EditorAction`]s cross into
/// the monitor's writer through its command channel.
pub struct SectorEditor<G: SectorGeometry> {
    geometry: G,
    sector: Option<SafeSector>,
    cursors: HashMap<PointerId, Cursor>,
}

impl<G: SectorGeometry> SectorEditor<G> {
    pub fn new(geometry: G) -> Self {
        Self {
            geometry,
            sector: None,
            cursors: HashMap::new(),
        }
    }

    /// Track the latest published sector snapshot
    pub fn set_sector(&mut self, sector: Option<SafeSector>) {
        self.sector = sector;
    }

    pub fn sector(&self) -> Option<&SafeSector> {
        self.sector.as_ref()
    }

    pub fn active_pointers(&self) -> usize {
        self.cursors.len()
    }

    pub fn cursor(&self, pointer: PointerId) -> Option<&Cursor> {
        self.cursors.get(&pointer)
    }

    /// Hit-test a touch-down. A cursor is created only when a handle is
    /// within `hit_radius`; a miss is ignored entirely.
    pub fn pointer_down(
        &mut self,
        pointer: PointerId,
        x: f64,
        y: f64,
        hit_radius: f64,
    ) -> Option<SectorHandle> {
        let sector = self.sector?;
        let handle = self.geometry.hit_test(&sector, x, y, hit_radius)?;
        let (hx, hy) = sector.handle_position(handle)?;
        self.cursors.insert(
            pointer,
            Cursor {
                handle,
                grab_dx: hx - x,
                grab_dy: hy - y,
            },
        );
        debug!("pointer {pointer} grabbed {handle:?}");
        Some(handle)
    }

    /// Drag the handle bound to `pointer`. Every move yields a new preview
    /// snapshot; moves without a cursor are no-ops.
    pub fn pointer_move(&mut self, pointer: PointerId, x: f64, y: f64) -> Option<EditorAction> {
        let cursor = *self.cursors.get(&pointer)?;
        let sector = self.sector?;
        let next = self.geometry.drag_handle(
            &sector,
            cursor.handle,
            x + cursor.grab_dx,
            y + cursor.grab_dy,
        );
        self.sector = Some(next);
        Some(EditorAction::Preview(next))
    }

    /// Release `pointer`, committing its final handle value. Other pointers
    /// still dragging are unaffected.
    pub fn pointer_up(&mut self, pointer: PointerId, x: f64, y: f64) -> Option<EditorAction> {
        let cursor = self.cursors.remove(&pointer)?;
        let sector = self.sector?;
        let finished = self.geometry.drag_handle(
            &sector,
            cursor.handle,
            x + cursor.grab_dx,
            y + cursor.grab_dy,
        );
        self.sector = Some(finished);
        debug!("pointer {pointer} released {:?}", cursor.handle);
        Some(EditorAction::Commit(finished))
    }

    /// Abort `pointer`'s drag without committing
    pub fn pointer_cancel(&mut self, pointer: PointerId) {
        if self.cursors.remove(&pointer).is_some() {
            debug!("pointer {pointer} cancelled");
        }
    }
}
