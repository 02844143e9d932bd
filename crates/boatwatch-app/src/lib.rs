//! # boatwatch-app - Supervisory Control Logic
//!
//! The anchor-watch control subsystem: the single-writer monitor service,
//! watcher fan-out, adaptive sampling, the two-channel alarm state machine,
//! multi-pointer sector editing and runtime settings.
//!
//! Depends on [`boatwatch_core`] for domain types and on
//! [`boatwatch_daemon`] for the external-world adapters.
//!
//! ## Public API
//!
//! ### Monitor (`monitor`)
//! - [`MonitorService`] - Composes everything; owns the watch state
//! - [`MonitorHandle`] - Clonable control surface for UI clients and sources
//! - [`Command`] - The writer task's mailbox vocabulary
//!
//! ### Fan-out (`registry`)
//! - [`WatcherRegistry`] - Subscription table with snapshot publish
//! - [`Watcher`], [`ChannelWatcher`] - Subscriber capability and adapter
//!
//! ### Sampling (`sampling`)
//! - [`sampling::plan`] - Pure hint→interval clamping
//! - [`SamplingController`] - Churn-free source re-registration
//!
//! ### Alarms (`alarm`)
//! - [`AlarmController`] - Drift/accuracy channels with mute windows
//!
//! ### Editing (`editor`)
//! - [`SectorEditor`] - Per-pointer cursor state machine
//!
//! ### Settings (`settings`)
//! - [`WatchSettings`], [`SettingChange`], [`SettingParser`]

pub mod alarm;
pub mod editor;
pub mod monitor;
pub mod registry;
pub mod sampling;
pub mod settings;

pub use alarm::{AlarmController, AlarmState};
pub use editor::{Cursor, EditorAction, PointerId, SectorEditor};
pub use monitor::{Command, MonitorHandle, MonitorService};
pub use registry::{ChannelWatcher, Watcher, WatcherId, WatcherRegistry};
pub use sampling::{SamplingController, SamplingPlan};
pub use settings::{
    default_config_path, load_settings, save_settings, SettingChange, SettingParser,
    WatchSettings,
};
