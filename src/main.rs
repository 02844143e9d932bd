//! BoatWatch - anchor watch daemon for small vessels
//!
//! This is the binary entry point. All logic lives in the workspace crates.

use std::path::PathBuf;

use clap::Parser;

use boatwatch_app::{default_config_path, load_settings, ChannelWatcher, MonitorService};
use boatwatch_core::prelude::*;
use boatwatch_core::{format_distance, WatchEvent};
use boatwatch_daemon::{
    AnchorageConfig, LogAlarmSink, PersistenceStore, RingEstimator, StdinSource,
};

/// BoatWatch - anchor watch daemon for small vessels
#[derive(Parser, Debug)]
#[command(name = "bwatchd")]
#[command(about = "Supervises a vessel's anchored position", long_about = None)]
struct Args {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Feed the watch from the built-in anchorage simulator
    #[arg(long)]
    simulate: bool,

    /// Discard the persisted snapshot when exiting
    #[arg(long)]
    forget_on_exit: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    boatwatch_core::logging::init()?;

    let config_path = args.config.unwrap_or_else(default_config_path);
    let mut settings = load_settings(&config_path);
    if args.simulate {
        settings.simulate = true;
    }
    let unit = settings.distance_unit;
    info!(
        simulate = settings.simulate,
        config = %config_path.display(),
        "configuration loaded"
    );

    let service = MonitorService::new(
        settings,
        Box::new(RingEstimator::new()),
        PersistenceStore::new(),
        Box::new(LogAlarmSink::default()),
        Box::new(StdinSource::new()),
        AnchorageConfig::default(),
    );
    let (handle, monitor) = service.spawn();

    // Narrate geometry updates to the log, the way a chart UI would consume
    // them on the other side of the fan-out.
    let (watcher, mut events) = ChannelWatcher::pair();
    handle.register_watcher(watcher);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                WatchEvent::Location(fix) => {
                    trace!("fix {:.6} {:.6} ±{}m", fix.x, fix.y, fix.accuracy);
                }
                WatchEvent::EstimatedCircle(circle) => {
                    debug!(
                        "estimated circle radius {}",
                        format_distance(circle.radius, unit)
                    );
                }
                WatchEvent::SafeSector(sector) => {
                    info!("safe sector radius {}", format_distance(sector.radius, unit));
                }
                WatchEvent::Alarm { kind, distance } => {
                    warn!(
                        "alarm {kind}: {} beyond the boundary",
                        format_distance(distance, unit)
                    );
                }
                WatchEvent::Area(_) | WatchEvent::OuterPath(_) => {}
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.stop(args.forget_on_exit);
    let _ = monitor.await;
    Ok(())
}
