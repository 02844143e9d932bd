//! The monitor service.
//!
//! Sole owner of the watch state. Fix arrivals, timer firings, runtime
//! setting changes and manual-edit commits are all serialized onto one
//! writer task through a command mailbox, so concurrent producers never race
//! on the state. Watcher registration goes directly to the shared
//! [`WatcherRegistry`], which is safe to touch concurrently with a publish.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use boatwatch_core::prelude::*;
use boatwatch_core::{AlarmKind, Fix, SafeSector, WatchEvent};
use boatwatch_daemon::{
    AlarmSink, AnchorEstimator, AnchorageConfig, AnchorageSimulator, EstimatorEvent, FixSource,
    PersistenceStore,
};

use crate::alarm::AlarmController;
use crate::registry::{Watcher, WatcherId, WatcherRegistry};
use crate::sampling::SamplingController;
use crate::settings::{SettingChange, WatchSettings};

/// Everything the writer task can be asked to do
#[derive(Debug, Clone)]
pub enum Command {
    /// A fix arrived from the active source
    Fix(Fix),
    /// Runtime setting change, pushed without restart
    ApplySetting(SettingChange),
    /// Silence a firing alarm channel
    Mute(AlarmKind),
    /// Clear the watch state, independent of persistence
    ResetWatch,
    /// Stop the service; `forget` discards the persisted snapshot
    Stop { forget: bool },
    /// Live sector snapshot from an in-progress drag
    SectorPreview(SafeSector),
    /// Final sector value from a released drag
    SectorCommit(SafeSector),
    /// Accuracy watchdog expired (internal)
    AccuracyTimeout { generation: u64 },
    /// A mute window ran out (internal)
    MuteExpired { kind: AlarmKind, generation: u64 },
}

/// Clonable control surface handed to UI adapters and fix plumbing
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::UnboundedSender<Command>,
    registry: Arc<WatcherRegistry>,
}

impl MonitorHandle {
    fn send(&self, cmd: Command) -> Result<()> {
        self.tx.send(cmd).map_err(|_| Error::ChannelClosed)
    }

    pub fn on_fix(&self, fix: Fix) -> Result<()> {
        self.send(Command::Fix(fix))
    }

    pub fn apply_setting(&self, change: SettingChange) -> Result<()> {
        self.send(Command::ApplySetting(change))
    }

    pub fn mute(&self, kind: AlarmKind) -> Result<()> {
        self.send(Command::Mute(kind))
    }

    pub fn reset(&self) -> Result<()> {
        self.send(Command::ResetWatch)
    }

    /// Request a stop. Safe to call more than once; later calls are no-ops.
    pub fn stop(&self, forget: bool) {
        let _ = self.tx.send(Command::Stop { forget });
    }

    pub fn sector_preview(&self, sector: SafeSector) -> Result<()> {
        self.send(Command::SectorPreview(sector))
    }

    pub fn sector_commit(&self, sector: SafeSector) -> Result<()> {
        self.send(Command::SectorCommit(sector))
    }

    pub fn register_watcher(&self, watcher: Arc<dyn Watcher>) -> WatcherId {
        self.registry.register(watcher)
    }

    pub fn unregister_watcher(&self, id: WatcherId) -> bool {
        self.registry.unregister(id)
    }
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("registry", &self.registry)
            .finish()
    }
}

/// One generation-stamped timer. Cancelling an already-fired or
/// already-cancelled timer is a no-op: the generation bump makes stale
/// firings compare unequal, the abort is best-effort cleanup.
#[derive(Debug, Default)]
struct TimerSlot {
    generation: u64,
    task: Option<JoinHandle<()>>,
    armed: bool,
}

impl TimerSlot {
    fn cancel(&mut self) {
        self.generation += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.armed = false;
    }
}

/// The anchor-watch supervisor, before it is spawned
pub struct MonitorService {
    settings: WatchSettings,
    estimator: Box<dyn AnchorEstimator>,
    store: PersistenceStore,
    sink: Box<dyn AlarmSink>,
    live_source: Box<dyn FixSource>,
    sim_config: AnchorageConfig,
}

impl MonitorService {
    pub fn new(
        settings: WatchSettings,
        estimator: Box<dyn AnchorEstimator>,
        store: PersistenceStore,
        sink: Box<dyn AlarmSink>,
        live_source: Box<dyn FixSource>,
        sim_config: AnchorageConfig,
    ) -> Self {
        Self {
            settings,
            estimator,
            store,
            sink,
            live_source,
            sim_config,
        }
    }

    /// Restore the snapshot, install the fix source and start the writer
    /// task. Returns the control surface and the writer's join handle.
    pub fn spawn(self) -> (MonitorHandle, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(WatcherRegistry::new());

        // Fixes flow through their own channel and are folded into the
        // mailbox, so sources never learn about Command. Internal senders
        // are weak: only live MonitorHandles keep the mailbox open.
        let (fix_tx, mut fix_rx) = mpsc::unbounded_channel::<Fix>();
        let fix_fwd = cmd_tx.downgrade();
        tokio::spawn(async move {
            while let Some(fix) = fix_rx.recv().await {
                let Some(tx) = fix_fwd.upgrade() else { break };
                if tx.send(Command::Fix(fix)).is_err() {
                    break;
                }
            }
        });

        let max_sleep = self.settings.max_sleep();
        let mut runner = Runner {
            settings: self.settings,
            estimator: self.estimator,
            store: self.store,
            registry: Arc::clone(&registry),
            alarms: AlarmController::new(self.sink),
            sampling: SamplingController::new(max_sleep),
            live_source: self.live_source,
            simulator: AnchorageSimulator::new(self.sim_config),
            fix_tx,
            cmd_tx: cmd_tx.downgrade(),
            watchdog: TimerSlot::default(),
            mute_tasks: HashMap::new(),
            stopped: false,
        };

        let task = tokio::spawn(async move {
            runner.startup();
            runner.run(cmd_rx).await;
        });

        (
            MonitorHandle {
                tx: cmd_tx,
                registry,
            },
            task,
        )
    }
}

/// Writer-task state. Everything in here is touched from one task only.
struct Runner {
    settings: WatchSettings,
    estimator: Box<dyn AnchorEstimator>,
    store: PersistenceStore,
    registry: Arc<WatcherRegistry>,
    alarms: AlarmController,
    sampling: SamplingController,
    live_source: Box<dyn FixSource>,
    simulator: AnchorageSimulator,
    fix_tx: mpsc::UnboundedSender<Fix>,
    cmd_tx: mpsc::WeakUnboundedSender<Command>,
    watchdog: TimerSlot,
    mute_tasks: HashMap<AlarmKind, JoinHandle<()>>,
    stopped: bool,
}

impl Runner {
    fn startup(&mut self) {
        if let Some(state) = self.store.load() {
            self.estimator.restore(&state);
        }
        self.install_source();
    }

    async fn run(&mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            match rx.recv().await {
                Some(cmd) => {
                    if self.handle_command(cmd).is_break() {
                        break;
                    }
                }
                None => {
                    // Every handle dropped: treat as a normal stop
                    self.shutdown(false);
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) -> ControlFlow<()> {
        match cmd {
            Command::Fix(fix) => self.on_fix(fix),
            Command::ApplySetting(change) => self.on_setting(change),
            Command::Mute(kind) => self.on_mute(kind),
            Command::ResetWatch => {
                info!("watch reset");
                self.estimator.reset();
                self.alarms.reset(AlarmKind::Drift);
                self.alarms.reset(AlarmKind::Accuracy);
            }
            Command::SectorPreview(sector) => {
                self.registry.publish(&WatchEvent::SafeSector(sector));
            }
            Command::SectorCommit(sector) => {
                let adopted = self.estimator.commit_sector(sector);
                self.registry.publish(&WatchEvent::SafeSector(adopted));
            }
            Command::AccuracyTimeout { generation } => self.on_watchdog_fired(generation),
            Command::MuteExpired { kind, generation } => {
                self.mute_tasks.remove(&kind);
                self.alarms.resume(kind, generation);
            }
            Command::Stop { forget } => {
                self.shutdown(forget);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // ─────────────────────────────────────────────────────────────
    // Fix path
    // ─────────────────────────────────────────────────────────────

    fn on_fix(&mut self, fix: Fix) {
        if fix.accuracy > self.settings.min_accuracy_m {
            debug!(
                accuracy = fix.accuracy,
                min = self.settings.min_accuracy_m,
                "fix discarded, accuracy below threshold"
            );
            // The silence clock keeps running; arm it if nothing is pending
            self.arm_watchdog_if_absent();
            return;
        }

        // A usable fix resolves any accuracy alarm and restarts the
        // watchdog from scratch.
        self.alarms.reset(AlarmKind::Accuracy);
        self.rearm_watchdog();

        let events = self.estimator.update(&fix);
        self.dispatch_estimator_events(events);
    }

    fn dispatch_estimator_events(&mut self, events: Vec<EstimatorEvent>) {
        for event in events {
            match event {
                EstimatorEvent::Location(fix) => {
                    self.registry.publish(&WatchEvent::Location(fix));
                }
                EstimatorEvent::Area(polygon) => {
                    self.registry.publish(&WatchEvent::Area(polygon));
                }
                EstimatorEvent::OuterPath(path) => {
                    self.registry.publish(&WatchEvent::OuterPath(path));
                }
                EstimatorEvent::Estimated(circle) => {
                    self.registry.publish(&WatchEvent::EstimatedCircle(circle));
                }
                EstimatorEvent::Safe(sector) => {
                    self.registry.publish(&WatchEvent::SafeSector(sector));
                }
                EstimatorEvent::Hint(hint) => {
                    if let Some((interval, min_distance_m)) = self.sampling.on_hint(hint) {
                        self.reregister_source(interval, min_distance_m);
                    }
                }
                EstimatorEvent::Alarm { distance } => {
                    self.alarms
                        .trigger(AlarmKind::Drift, &self.settings.alarm_tone);
                    self.registry.publish(&WatchEvent::Alarm {
                        kind: AlarmKind::Drift,
                        distance,
                    });
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────

    fn on_setting(&mut self, change: SettingChange) {
        let was_simulating = self.settings.simulate;
        debug!("applying {change:?}");
        self.settings.apply(&change);
        match change {
            SettingChange::Simulate(now) if now != was_simulating => {
                // Switching the source invalidates the accumulated fixes
                self.estimator.reset();
                self.install_source();
            }
            SettingChange::MaxGpsSleep(_) => {
                self.sampling.set_max_interval(self.settings.max_sleep());
            }
            // Alarm times and the rest take effect on their next use
            _ => {}
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Sources
    // ─────────────────────────────────────────────────────────────

    fn install_source(&mut self) {
        self.live_source.cancel();
        self.simulator.cancel();
        self.sampling.reset();

        let result = if self.settings.simulate {
            self.cancel_watchdog();
            info!("installing anchorage simulator");
            self.simulator
                .request_updates(Duration::ZERO, 1.0, self.fix_tx.clone())
        } else {
            info!("installing live fix source");
            self.rearm_watchdog();
            self.live_source
                .request_updates(Duration::ZERO, 1.0, self.fix_tx.clone())
        };
        if let Err(e) = result {
            warn!("failed to install fix source: {e}");
        }
    }

    fn reregister_source(&mut self, interval: Duration, min_distance_m: f64) {
        let result = if self.settings.simulate {
            self.simulator
                .request_updates(interval, min_distance_m, self.fix_tx.clone())
        } else {
            self.live_source
                .request_updates(interval, min_distance_m, self.fix_tx.clone())
        };
        if let Err(e) = result {
            warn!("fix source re-registration failed: {e}");
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Accuracy watchdog
    // ─────────────────────────────────────────────────────────────

    fn arm_watchdog(&mut self) {
        if self.settings.simulate {
            return;
        }
        self.watchdog.generation += 1;
        let generation = self.watchdog.generation;
        let timeout = self.settings.accuracy_alarm_duration();
        let tx = self.cmd_tx.clone();
        self.watchdog.task = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::AccuracyTimeout { generation });
            }
        }));
        self.watchdog.armed = true;
    }

    fn arm_watchdog_if_absent(&mut self) {
        if !self.watchdog.armed {
            self.arm_watchdog();
        }
    }

    fn rearm_watchdog(&mut self) {
        self.watchdog.cancel();
        self.arm_watchdog();
    }

    fn cancel_watchdog(&mut self) {
        self.watchdog.cancel();
    }

    fn on_watchdog_fired(&mut self, generation: u64) {
        if !self.watchdog.armed || generation != self.watchdog.generation {
            return; // stale timer
        }
        self.watchdog.armed = false;
        self.watchdog.task = None;
        warn!("no usable fix within the accuracy alarm timeout");
        self.alarms
            .trigger(AlarmKind::Accuracy, &self.settings.alarm_tone);
        self.registry.publish(&WatchEvent::Alarm {
            kind: AlarmKind::Accuracy,
            distance: 0.0,
        });
    }

    // ─────────────────────────────────────────────────────────────
    // Mute / stop
    // ─────────────────────────────────────────────────────────────

    fn on_mute(&mut self, kind: AlarmKind) {
        let Some(generation) = self.alarms.mute(kind) else {
            return;
        };
        // Re-muting replaces the pending resume instead of stacking
        if let Some(task) = self.mute_tasks.remove(&kind) {
            task.abort();
        }
        let duration = self.settings.mute_duration();
        let tx = self.cmd_tx.clone();
        self.mute_tasks.insert(
            kind,
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                if let Some(tx) = tx.upgrade() {
                    let _ = tx.send(Command::MuteExpired { kind, generation });
                }
            }),
        );
        // Acknowledging the accuracy alarm also quiets its watchdog until
        // the next fix restarts it.
        if kind == AlarmKind::Accuracy {
            self.cancel_watchdog();
        }
    }

    fn shutdown(&mut self, forget: bool) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.live_source.cancel();
        self.simulator.cancel();
        self.cancel_watchdog();
        for (_, task) in self.mute_tasks.drain() {
            task.abort();
        }
        self.alarms.reset(AlarmKind::Drift);
        self.alarms.reset(AlarmKind::Accuracy);

        if forget {
            if let Err(e) = self.store.delete() {
                warn!("failed to discard snapshot: {e}");
            }
        } else if let Err(e) = self.store.save(&self.estimator.snapshot()) {
            warn!("failed to persist snapshot: {e}");
        }
        info!(forget, "monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ChannelWatcher;
    use boatwatch_core::SamplingHint;
    use boatwatch_daemon::RingEstimator;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // ─────────────────────────────────────────────────────────────
    // Test doubles
    // ─────────────────────────────────────────────────────────────

    #[derive(Debug, Default)]
    struct SinkLog {
        surfaced: Vec<AlarmKind>,
        acquires: usize,
    }

    struct TestSink(Arc<Mutex<SinkLog>>);

    impl AlarmSink for TestSink {
        fn acquire(&mut self) -> Result<()> {
            self.0.lock().unwrap().acquires += 1;
            Ok(())
        }
        fn release(&mut self) {}
        fn play(&mut self, _tone: &str) -> Result<()> {
            Ok(())
        }
        fn stop(&mut self) {}
        fn surface(&mut self, kind: AlarmKind) {
            self.0.lock().unwrap().surfaced.push(kind);
        }
    }

    #[derive(Default)]
    struct SourceLog {
        requests: Vec<(Duration, f64)>,
        cancels: usize,
    }

    struct TestSource(Arc<Mutex<SourceLog>>);

    impl FixSource for TestSource {
        fn request_updates(
            &mut self,
            interval: Duration,
            min_distance_m: f64,
            _tx: mpsc::UnboundedSender<Fix>,
        ) -> Result<()> {
            self.0.lock().unwrap().requests.push((interval, min_distance_m));
            Ok(())
        }
        fn cancel(&mut self) {
            self.0.lock().unwrap().cancels += 1;
        }
    }

    /// Estimator returning scripted event batches, one per update
    struct ScriptedEstimator {
        batches: VecDeque<Vec<EstimatorEvent>>,
    }

    impl ScriptedEstimator {
        fn new(batches: Vec<Vec<EstimatorEvent>>) -> Self {
            Self {
                batches: batches.into(),
            }
        }
    }

    impl AnchorEstimator for ScriptedEstimator {
        fn update(&mut self, _fix: &Fix) -> Vec<EstimatorEvent> {
            self.batches.pop_front().unwrap_or_default()
        }
        fn drag_handle(
            &self,
            sector: &SafeSector,
            _handle: boatwatch_core::SectorHandle,
            _x: f64,
            _y: f64,
        ) -> SafeSector {
            *sector
        }
        fn commit_sector(&mut self, sector: SafeSector) -> SafeSector {
            sector
        }
        fn reset(&mut self) {}
        fn snapshot(&self) -> boatwatch_core::WatchState {
            boatwatch_core::WatchState::default()
        }
        fn restore(&mut self, _state: &boatwatch_core::WatchState) {}
    }

    struct Fixture {
        handle: MonitorHandle,
        task: JoinHandle<()>,
        events: mpsc::UnboundedReceiver<WatchEvent>,
        sink_log: Arc<Mutex<SinkLog>>,
        source_log: Arc<Mutex<SourceLog>>,
        _tmp: tempfile::TempDir,
    }

    fn spawn_monitor(settings: WatchSettings, estimator: Box<dyn AnchorEstimator>) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        spawn_monitor_at(settings, estimator, &tmp.path().to_path_buf(), tmp)
    }

    fn spawn_monitor_at(
        settings: WatchSettings,
        estimator: Box<dyn AnchorEstimator>,
        dir: &std::path::PathBuf,
        tmp: tempfile::TempDir,
    ) -> Fixture {
        let sink_log = Arc::new(Mutex::new(SinkLog::default()));
        let source_log = Arc::new(Mutex::new(SourceLog::default()));
        let service = MonitorService::new(
            settings,
            estimator,
            PersistenceStore::with_dir(dir),
            Box::new(TestSink(sink_log.clone())),
            Box::new(TestSource(source_log.clone())),
            AnchorageConfig::default(),
        );
        let (handle, task) = service.spawn();
        let (watcher, events) = ChannelWatcher::pair();
        handle.register_watcher(watcher);
        Fixture {
            handle,
            task,
            events,
            sink_log,
            source_log,
            _tmp: tmp,
        }
    }

    fn live_settings() -> WatchSettings {
        WatchSettings {
            simulate: false,
            min_accuracy_m: 10.0,
            accuracy_alarm_min: 1,
            mute_min: 1,
            ..WatchSettings::default()
        }
    }

    fn good_fix(x: f64, y: f64) -> Fix {
        Fix::new(x, y, Utc::now(), 5.0)
    }

    fn bad_fix() -> Fix {
        Fix::new(25.0, 60.0, Utc::now(), 50.0)
    }

    async fn next_alarm(events: &mut mpsc::UnboundedReceiver<WatchEvent>) -> (AlarmKind, f64) {
        loop {
            match events.recv().await.expect("event stream open") {
                WatchEvent::Alarm { kind, distance } => return (kind, distance),
                _ => continue,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Scenarios
    // ─────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_accuracy_alarm_after_silent_timeout() {
        let mut fx = spawn_monitor(live_settings(), Box::new(RingEstimator::new()));

        // Three below-threshold fixes: discarded, watchdog stays armed
        for _ in 0..3 {
            fx.handle.on_fix(bad_fix()).unwrap();
        }

        let (kind, _) = next_alarm(&mut fx.events).await;
        assert_eq!(kind, AlarmKind::Accuracy);
        assert_eq!(fx.sink_log.lock().unwrap().surfaced, vec![AlarmKind::Accuracy]);

        // Zero fixes were accepted: no location event was ever published
        fx.handle.stop(false);
        fx.task.await.unwrap();
        let mut saw_location = false;
        while let Ok(event) = fx.events.try_recv() {
            if matches!(event, WatchEvent::Location(_)) {
                saw_location = true;
            }
        }
        assert!(!saw_location);
    }

    #[tokio::test(start_paused = true)]
    async fn test_good_fix_cancels_pending_watchdog() {
        let mut fx = spawn_monitor(live_settings(), Box::new(RingEstimator::new()));

        fx.handle.on_fix(bad_fix()).unwrap();
        // Part of the timeout elapses, then a usable fix arrives
        tokio::time::sleep(Duration::from_secs(30)).await;
        fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        // Wait for it to be processed
        loop {
            if let Some(WatchEvent::Location(_)) = fx.events.recv().await {
                break;
            }
        }

        // Past the original deadline: the cancelled timer must not fire
        tokio::time::sleep(Duration::from_secs(40)).await;
        while let Ok(event) = fx.events.try_recv() {
            assert!(!matches!(event, WatchEvent::Alarm { .. }));
        }

        // The fresh watchdog armed by the good fix still works
        tokio::time::sleep(Duration::from_secs(30)).await;
        let (kind, _) = next_alarm(&mut fx.events).await;
        assert_eq!(kind, AlarmKind::Accuracy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drift_alarm_fires_once_and_mute_rearms() {
        let outside = EstimatorEvent::Alarm { distance: 0.002 };
        let estimator = ScriptedEstimator::new(vec![
            vec![outside.clone()],
            vec![outside.clone()],
            vec![outside.clone()],
        ]);
        // Long accuracy timeout keeps the watchdog out of this scenario
        let settings = WatchSettings {
            accuracy_alarm_min: 60,
            ..live_settings()
        };
        let mut fx = spawn_monitor(settings, Box::new(estimator));

        fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        let (kind, distance) = next_alarm(&mut fx.events).await;
        assert_eq!(kind, AlarmKind::Drift);
        assert!(distance > 0.0);

        // Still outside on the next fix: no second surfacing
        fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        let _ = next_alarm(&mut fx.events).await; // event fan-out continues
        assert_eq!(fx.sink_log.lock().unwrap().surfaced, vec![AlarmKind::Drift]);
        assert_eq!(fx.sink_log.lock().unwrap().acquires, 1);

        // Mute, let the window expire, drift again: fires anew
        fx.handle.mute(AlarmKind::Drift).unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;
        fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        let _ = next_alarm(&mut fx.events).await;
        assert_eq!(
            fx.sink_log.lock().unwrap().surfaced,
            vec![AlarmKind::Drift, AlarmKind::Drift]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remute_extends_the_window_instead_of_stacking() {
        let outside = EstimatorEvent::Alarm { distance: 0.001 };
        let estimator = ScriptedEstimator::new(vec![vec![outside.clone()]; 8]);
        let settings = WatchSettings {
            accuracy_alarm_min: 60,
            mute_min: 1,
            ..live_settings()
        };
        let mut fx = spawn_monitor(settings, Box::new(estimator));

        // t=0: fire and mute
        fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        let _ = next_alarm(&mut fx.events).await;
        fx.handle.mute(AlarmKind::Drift).unwrap();

        // t=30: mute again, pushing expiry to t=90
        tokio::time::sleep(Duration::from_secs(30)).await;
        fx.handle.mute(AlarmKind::Drift).unwrap();

        // t=65: past the first deadline, the channel must still be muted,
        // so a drifting fix raises no new surfacing
        tokio::time::sleep(Duration::from_secs(35)).await;
        fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        let _ = next_alarm(&mut fx.events).await;
        assert_eq!(fx.sink_log.lock().unwrap().surfaced, vec![AlarmKind::Drift]);

        // t=95: past the rescheduled deadline, the channel re-armed
        tokio::time::sleep(Duration::from_secs(30)).await;
        fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        let _ = next_alarm(&mut fx.events).await;
        assert_eq!(
            fx.sink_log.lock().unwrap().surfaced,
            vec![AlarmKind::Drift, AlarmKind::Drift]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_hint_drives_reregistration() {
        let estimator = ScriptedEstimator::new(vec![
            vec![EstimatorEvent::Hint(SamplingHint::new(30.0, 8.0))],
            // Noise within one second of the applied interval: no churn
            vec![EstimatorEvent::Hint(SamplingHint::new(30.4, 8.0))],
            vec![EstimatorEvent::Hint(SamplingHint::new(29.7, 8.0))],
            // A real change
            vec![EstimatorEvent::Hint(SamplingHint::new(5.0, 2.0))],
        ]);
        let mut fx = spawn_monitor(live_settings(), Box::new(estimator));

        for _ in 0..4 {
            fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        }
        fx.handle.stop(false);
        fx.task.await.unwrap();
        drop(fx.events);

        let log = fx.source_log.lock().unwrap();
        // Initial install, the 30s hint, then the 5s hint. Nothing else.
        assert_eq!(
            log.requests,
            vec![
                (Duration::ZERO, 1.0),
                (Duration::from_secs(30), 8.0),
                (Duration::from_secs(5), 2.0),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_commit_is_validated_and_published() {
        let mut fx = spawn_monitor(live_settings(), Box::new(RingEstimator::new()));

        // A commit below the minimum radius comes back widened
        fx.handle
            .sector_commit(SafeSector::circle(25.0, 60.0, 0.0))
            .unwrap();
        loop {
            if let Some(WatchEvent::SafeSector(s)) = fx.events.recv().await {
                assert!(s.radius > 0.0);
                break;
            }
        }

        // Previews pass through untouched
        let preview = SafeSector::circle(25.0, 60.0, 0.5);
        fx.handle.sector_preview(preview).unwrap();
        loop {
            if let Some(WatchEvent::SafeSector(s)) = fx.events.recv().await {
                assert_eq!(s, preview);
                break;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_persists_and_restart_restores() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let store = PersistenceStore::with_dir(&dir);

        let mut fx = spawn_monitor_at(
            live_settings(),
            Box::new(RingEstimator::new()),
            &dir,
            tmp,
        );

        // Swing through a few accepted fixes, then pin a manual sector
        for i in 0..5 {
            fx.handle
                .on_fix(good_fix(25.0 + f64::from(i) * 1e-5, 60.0))
                .unwrap();
        }
        let manual = SafeSector::wedge(25.0, 60.0, 0.01, 1.2, 0.4);
        fx.handle.sector_commit(manual).unwrap();
        fx.handle.stop(false);
        fx.task.await.unwrap();

        let persisted = store.load().expect("snapshot written on stop");
        let restored_sector = persisted.safe.expect("safe sector persisted");
        assert!((restored_sector.radius - manual.radius).abs() < 1e-9);
        assert!((restored_sector.left_angle - manual.left_angle).abs() < 1e-9);
        assert!((restored_sector.right_angle - manual.right_angle).abs() < 1e-9);
        assert!(persisted.manual_sector);
        assert_eq!(persisted.fixes.len(), 5);

        // A restarted monitor picks the snapshot up again
        let tmp2 = tempfile::TempDir::new().unwrap(); // unused second dir guard
        let fx2 = spawn_monitor_at(
            live_settings(),
            Box::new(RingEstimator::new()),
            &dir,
            tmp2,
        );
        fx2.handle.stop(false);
        fx2.task.await.unwrap();
        // Stopping immediately re-persists the restored state unchanged
        let round_tripped = store.load().expect("snapshot survives restart");
        assert_eq!(round_tripped, persisted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_stop_discards_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let store = PersistenceStore::with_dir(&dir);

        let fx = spawn_monitor_at(
            live_settings(),
            Box::new(RingEstimator::new()),
            &dir,
            tmp,
        );
        fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        fx.handle.stop(true);
        fx.task.await.unwrap();
        assert!(store.load().is_none());

        // A second stop on a stopped monitor is a no-op
        fx.handle.stop(true);
        fx.handle.stop(false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_mode_feeds_the_estimator() {
        let settings = WatchSettings {
            simulate: true,
            ..live_settings()
        };
        let mut fx = spawn_monitor(settings, Box::new(RingEstimator::new()));

        // The simulator produces fixes on its own; geometry flows out
        let mut saw_location = false;
        let mut saw_sector = false;
        for _ in 0..20 {
            match fx.events.recv().await.expect("events") {
                WatchEvent::Location(_) => saw_location = true,
                WatchEvent::SafeSector(_) => saw_sector = true,
                _ => {}
            }
            if saw_location && saw_sector {
                break;
            }
        }
        assert!(saw_location && saw_sector);

        fx.handle.stop(true);
        fx.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_toggle_swaps_source_and_resets() {
        let mut fx = spawn_monitor(live_settings(), Box::new(RingEstimator::new()));
        fx.handle.on_fix(good_fix(25.0, 60.0)).unwrap();
        loop {
            if let Some(WatchEvent::Location(_)) = fx.events.recv().await {
                break;
            }
        }

        fx.handle
            .apply_setting(SettingChange::Simulate(true))
            .unwrap();
        // Simulator fixes start flowing without any manual feed
        loop {
            if let Some(WatchEvent::Location(_)) = fx.events.recv().await {
                break;
            }
        }

        fx.handle.stop(true);
        fx.task.await.unwrap();
        // The live source was cancelled when the simulator took over
        assert!(fx.source_log.lock().unwrap().cancels >= 1);
    }
}
