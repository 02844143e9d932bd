//! Alarm resource sink.
//!
//! Models the exclusive resources an alarm holds while firing: the
//! wake-equivalent lock, audio output and the acknowledgment surface. The
//! alarm controller guarantees at most one live acquisition regardless of how
//! many channels are firing.

use boatwatch_core::prelude::*;
use boatwatch_core::AlarmKind;

/// Platform resources used while an alarm is firing.
///
/// `play` failures are recoverable: the alarm keeps firing silently and the
/// surfacing path is unaffected.
pub trait AlarmSink: Send {
    /// Take the wake/audio-focus resources. Called once per acquisition;
    /// the controller never double-acquires.
    fn acquire(&mut self) -> Result<()>;

    /// Give the resources back. Idempotent.
    fn release(&mut self);

    /// Start the alarm tone
    fn play(&mut self, tone: &str) -> Result<()>;

    /// Stop the alarm tone. Idempotent.
    fn stop(&mut self);

    /// Bring the acknowledgment surface for `kind` to the foreground
    fn surface(&mut self, kind: AlarmKind);
}

/// Logging-only sink used by the headless daemon
#[derive(Debug, Default)]
pub struct LogAlarmSink {
    held: bool,
}

impl AlarmSink for LogAlarmSink {
    fn acquire(&mut self) -> Result<()> {
        self.held = true;
        info!("alarm resources acquired");
        Ok(())
    }

    fn release(&mut self) {
        if self.held {
            self.held = false;
            info!("alarm resources released");
        }
    }

    fn play(&mut self, tone: &str) -> Result<()> {
        if tone.is_empty() {
            return Err(Error::NoAlarmTone);
        }
        info!(tone, "alarm tone started");
        Ok(())
    }

    fn stop(&mut self) {
        info!("alarm tone stopped");
    }

    fn surface(&mut self, kind: AlarmKind) {
        warn!(action = kind.action(), "ALARM: {kind}");
    }
}
