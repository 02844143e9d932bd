//! Fix sources.
//!
//! A fix source pushes position observations into the monitor at a requested
//! rate. Re-registration with a new interval replaces the previous
//! subscription; there is never more than one active subscription per source.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

use boatwatch_core::prelude::*;
use boatwatch_core::{chart_to_meters, Fix};

/// Provider of position fixes (GPS receiver, NMEA bridge, simulator).
pub trait FixSource: Send {
    /// Start or replace the fix subscription.
    ///
    /// `interval` is the requested sleep between fixes (zero means
    /// continuous), `min_distance_m` the movement below which updates are
    /// uninteresting. Fixes are delivered through `tx`.
    fn request_updates(
        &mut self,
        interval: Duration,
        min_distance_m: f64,
        tx: mpsc::UnboundedSender<Fix>,
    ) -> Result<()>;

    /// Stop delivering fixes. Idempotent.
    fn cancel(&mut self);
}

// ─────────────────────────────────────────────────────────────────────────────
// Anchorage simulator
// ─────────────────────────────────────────────────────────────────────────────

/// Fastest tick the simulator runs at, also used for "continuous" requests
const MIN_TICK: Duration = Duration::from_millis(1000);

/// Simulated anchorage: the vessel swings around a fixed anchor point.
///
/// Bearing performs a slow random walk, the scope stretches and slackens,
/// and each fix carries position noise proportional to the configured
/// accuracy.
#[derive(Debug, Clone)]
pub struct AnchorageConfig {
    /// Anchor longitude in degrees
    pub anchor_x: f64,
    /// Anchor latitude in degrees
    pub anchor_y: f64,
    /// Rode scope in meters (swing radius)
    pub scope_m: f64,
    /// Reported fix accuracy in meters
    pub accuracy_m: f64,
    /// RNG seed, fixed for reproducible runs
    pub seed: u64,
}

impl Default for AnchorageConfig {
    fn default() -> Self {
        Self {
            anchor_x: 25.04,
            anchor_y: 60.15,
            scope_m: 30.0,
            accuracy_m: 5.0,
            seed: 0x0b0a7,
        }
    }
}

/// Simulated fix source for `simulate` mode
pub struct AnchorageSimulator {
    config: AnchorageConfig,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl AnchorageSimulator {
    pub fn new(config: AnchorageConfig) -> Self {
        Self { config, task: None }
    }

    async fn run(
        config: AnchorageConfig,
        tick: Duration,
        tx: mpsc::UnboundedSender<Fix>,
    ) {
        let meters = 1.0 / chart_to_meters(1.0);
        let scope = config.scope_m * meters;
        let noise = config.accuracy_m * meters / 3.0;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut bearing: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let mut slack: f64 = 0.8;

        loop {
            tokio::time::sleep(tick).await;

            bearing += rng.gen_range(-0.15..0.15);
            slack = (slack + rng.gen_range(-0.05..0.05)).clamp(0.3, 1.0);
            let r = scope * slack;

            let x = config.anchor_x + r * bearing.cos() + rng.gen_range(-noise..noise);
            let y = config.anchor_y + r * bearing.sin() + rng.gen_range(-noise..noise);
            let speed = r * 0.15 * chart_to_meters(1.0) / tick.as_secs_f64().max(1.0);

            let fix = Fix::new(x, y, Utc::now(), config.accuracy_m).with_speed(speed);
            if tx.send(fix).is_err() {
                debug!("simulator receiver dropped, stopping");
                break;
            }
        }
    }
}

impl FixSource for AnchorageSimulator {
    fn request_updates(
        &mut self,
        interval: Duration,
        min_distance_m: f64,
        tx: mpsc::UnboundedSender<Fix>,
    ) -> Result<()> {
        self.cancel();
        let tick = interval.max(MIN_TICK);
        debug!(
            tick_ms = tick.as_millis() as u64,
            min_distance_m, "simulator subscription"
        );
        self.task = Some(tokio::spawn(Self::run(self.config.clone(), tick, tx)));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AnchorageSimulator {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stdin source
// ─────────────────────────────────────────────────────────────────────────────

/// Line-based live source for the headless daemon.
///
/// Reads whitespace-separated `lon lat accuracy [speed]` lines from standard
/// input, one fix per line. Malformed lines are logged and skipped. The
/// requested interval does not apply; whoever feeds the pipe sets the pace.
pub struct StdinSource {
    task: Option<tokio::task::JoinHandle<()>>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self { task: None }
    }

    async fn read_loop(tx: mpsc::UnboundedSender<Fix>) {
        use tokio::io::{AsyncBufReadExt, BufReader};

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match parse_fix_line(line) {
                        Some(fix) => {
                            if tx.send(fix).is_err() {
                                break;
                            }
                        }
                        None => warn!("unparseable fix line: {line:?}"),
                    }
                }
                Ok(None) => {
                    info!("fix input closed");
                    break;
                }
                Err(e) => {
                    warn!("fix input error: {e}");
                    break;
                }
            }
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FixSource for StdinSource {
    fn request_updates(
        &mut self,
        _interval: Duration,
        _min_distance_m: f64,
        tx: mpsc::UnboundedSender<Fix>,
    ) -> Result<()> {
        self.cancel();
        self.task = Some(tokio::spawn(Self::read_loop(tx)));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Parse one `lon lat accuracy [speed]` line
pub fn parse_fix_line(line: &str) -> Option<Fix> {
    let mut parts = line.split_whitespace();
    let x: f64 = parts.next()?.parse().ok()?;
    let y: f64 = parts.next()?.parse().ok()?;
    let accuracy: f64 = parts.next()?.parse().ok()?;
    let speed: Option<f64> = match parts.next() {
        Some(raw) => Some(raw.parse().ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }
    let fix = Fix {
        x,
        y,
        time: Utc::now(),
        accuracy,
        speed,
    };
    Some(fix)
}
