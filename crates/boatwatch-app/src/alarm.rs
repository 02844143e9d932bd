//! Two-channel alarm state machine.
//!
//! Each channel (drift, accuracy) moves through Idle → Firing → Muted
//! independently. Resource acquisition is shared: the first channel to fire
//! takes the wake/audio resources, later ones reuse them, and they are
//! released when no channel is firing anymore.
//!
//! Timer scheduling stays outside: `mute` hands back a generation token, the
//! monitor schedules the wakeup and posts it back through `resume`. A bumped
//! generation turns stale or cancelled timers into no-ops.

use boatwatch_core::prelude::*;
use boatwatch_core::AlarmKind;
use boatwatch_daemon::AlarmSink;

/// State of one alarm channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Idle,
    Firing,
    Muted,
}

#[derive(Debug)]
struct Channel {
    state: AlarmState,
    /// Bumped on every mute/cancel; stale timer firings compare unequal
    generation: u64,
}

impl Channel {
    fn new() -> Self {
        Self {
            state: AlarmState::Idle,
            generation: 0,
        }
    }
}

/// Both alarm channels plus the shared resource sink
pub struct AlarmController {
    drift: Channel,
    accuracy: Channel,
    sink: Box<dyn AlarmSink>,
    /// Whether the wake/audio resources are currently held
    resources_held: bool,
}

impl AlarmController {
    pub fn new(sink: Box<dyn AlarmSink>) -> Self {
        Self {
            drift: Channel::new(),
            accuracy: Channel::new(),
            sink,
            resources_held: false,
        }
    }

    fn channel(&self, kind: AlarmKind) -> &Channel {
        match kind {
            AlarmKind::Drift => &self.drift,
            AlarmKind::Accuracy => &self.accuracy,
        }
    }

    fn channel_mut(&mut self, kind: AlarmKind) -> &mut Channel {
        match kind {
            AlarmKind::Drift => &mut self.drift,
            AlarmKind::Accuracy => &mut self.accuracy,
        }
    }

    pub fn state(&self, kind: AlarmKind) -> AlarmState {
        self.channel(kind).state
    }

    fn any_firing(&self) -> bool {
        self.drift.state == AlarmState::Firing || self.accuracy.state == AlarmState::Firing
    }

    /// Take the shared resources unless some channel already holds them
    fn acquire_resources(&mut self, tone: &str) {
        if self.resources_held {
            return;
        }
        if let Err(e) = self.sink.acquire() {
            warn!("could not acquire alarm resources: {e}");
        }
        self.resources_held = true;
        if let Err(e) = self.sink.play(tone) {
            // Recoverable: the alarm keeps firing silently
            warn!("could not start alarm tone: {e}");
        }
    }

    /// Release the shared resources once no channel is firing anymore
    fn release_resources_if_unused(&mut self) {
        if self.resources_held && !self.any_firing() {
            self.sink.stop();
            self.sink.release();
            self.resources_held = false;
        }
    }

    /// Fire a channel. Idle → Firing acquires resources and surfaces the
    /// alarm exactly once; repeat triggers while Firing are no-ops, and a
    /// Muted channel stays silent until its mute window expires.
    ///
    /// Returns `true` on the Idle → Firing transition.
    pub fn trigger(&mut self, kind: AlarmKind, tone: &str) -> bool {
        match self.channel(kind).state {
            AlarmState::Firing => false,
            AlarmState::Muted => {
                trace!("{kind} alarm suppressed while muted");
                false
            }
            AlarmState::Idle => {
                info!("{kind} alarm firing");
                self.channel_mut(kind).state = AlarmState::Firing;
                self.acquire_resources(tone);
                self.sink.surface(kind);
                true
            }
        }
    }

    /// Mute a firing channel.
    ///
    /// Returns the generation token the auto-resume timer must carry.
    /// Muting an already muted channel reschedules (new token, old timers go
    /// stale) rather than stacking pending unmutes. Muting an idle channel
    /// is a no-op.
    pub fn mute(&mut self, kind: AlarmKind) -> Option<u64> {
        match self.channel(kind).state {
            AlarmState::Idle => None,
            AlarmState::Firing | AlarmState::Muted => {
                let ch = self.channel_mut(kind);
                ch.state = AlarmState::Muted;
                ch.generation += 1;
                let generation = ch.generation;
                info!("{kind} alarm muted");
                self.release_resources_if_unused();
                Some(generation)
            }
        }
    }

    /// Auto-resume after a mute window. Stale generations are no-ops, which
    /// makes timer cancellation idempotent.
    pub fn resume(&mut self, kind: AlarmKind, generation: u64) {
        let ch = self.channel_mut(kind);
        if ch.state == AlarmState::Muted && ch.generation == generation {
            ch.state = AlarmState::Idle;
            info!("{kind} alarm re-armed after mute");
        }
    }

    /// Return a channel to Idle from any state, cancelling any pending
    /// auto-resume. Safe to call repeatedly.
    pub fn reset(&mut self, kind: AlarmKind) {
        let ch = self.channel_mut(kind);
        if ch.state != AlarmState::Idle {
            debug!("{kind} alarm reset");
        }
        ch.state = AlarmState::Idle;
        ch.generation += 1;
        self.release_resources_if_unused();
    }
}

impl std::fmt::Debug for AlarmController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmController")
            .field("drift", &self.drift)
            .field("accuracy", &self.accuracy)
            .field("resources_held", &self.resources_held)
            .finish()
    }
}
