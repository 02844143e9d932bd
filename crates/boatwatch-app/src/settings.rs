//! Runtime configuration.
//!
//! Startup values come from `~/.config/boatwatch/config.toml`; runtime
//! changes arrive as typed [`SettingChange`] values through the monitor's
//! command channel. Raw key/value pairs from preference surfaces go through
//! [`SettingParser`], an explicit key→handler table. Malformed values are
//! rejected and the previous value stands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use boatwatch_core::prelude::*;
use boatwatch_core::DistanceUnit;

pub const CONFIG_FILENAME: &str = "config.toml";

// Preference keys, kept stable across UI surfaces
pub const PREF_SIMULATE: &str = "pref_simulate";
pub const PREF_ACCURACY: &str = "pref_accuracy";
pub const PREF_ACCURACY_ALARM_TIME: &str = "pref_accuracyalarmtime";
pub const PREF_MUTE: &str = "pref_mute";
pub const PREF_ALARM_TONE: &str = "pref_alarmtone";
pub const PREF_GPS_MAX_SLEEP: &str = "pref_gpsmaxsleep";
pub const PREF_DISTANCE_UNIT: &str = "pref_distanceunit";

/// Watch configuration (config.toml)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct WatchSettings {
    /// Feed the watch from the anchorage simulator instead of a live source
    pub simulate: bool,

    /// Fixes with a worse accuracy than this are discarded (meters)
    pub min_accuracy_m: f64,

    /// Fix silence tolerated before the accuracy alarm fires (minutes)
    pub accuracy_alarm_min: u32,

    /// How long a muted alarm stays silent (minutes)
    pub mute_min: u32,

    /// Alarm tone identifier handed to the audio sink
    pub alarm_tone: String,

    /// Longest sleep ever requested from the fix source (seconds)
    pub max_gps_sleep_secs: u32,

    /// Unit used when presenting distances
    pub distance_unit: DistanceUnit,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            simulate: false,
            min_accuracy_m: 20.0,
            accuracy_alarm_min: 5,
            mute_min: 5,
            alarm_tone: "default".to_string(),
            max_gps_sleep_secs: 60,
            distance_unit: DistanceUnit::Meters,
        }
    }
}

impl WatchSettings {
    pub fn accuracy_alarm_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.accuracy_alarm_min) * 60)
    }

    pub fn mute_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.mute_min) * 60)
    }

    pub fn max_sleep(&self) -> Duration {
        Duration::from_secs(u64::from(self.max_gps_sleep_secs))
    }

    /// Apply one runtime change
    pub fn apply(&mut self, change: &SettingChange) {
        match change {
            SettingChange::Simulate(v) => self.simulate = *v,
            SettingChange::MinAccuracy(v) => self.min_accuracy_m = *v,
            SettingChange::AccuracyAlarmTime(v) => self.accuracy_alarm_min = *v,
            SettingChange::MuteTime(v) => self.mute_min = *v,
            SettingChange::AlarmTone(v) => self.alarm_tone = v.clone(),
            SettingChange::MaxGpsSleep(v) => self.max_gps_sleep_secs = *v,
            SettingChange::DistanceUnit(v) => self.distance_unit = *v,
        }
    }
}

/// One typed runtime setting change
#[derive(Debug, Clone, PartialEq)]
pub enum SettingChange {
    Simulate(bool),
    MinAccuracy(f64),
    AccuracyAlarmTime(u32),
    MuteTime(u32),
    AlarmTone(String),
    MaxGpsSleep(u32),
    DistanceUnit(DistanceUnit),
}

// ─────────────────────────────────────────────────────────────────────────────
// Key dispatch
// ─────────────────────────────────────────────────────────────────────────────

type Handler = fn(&str) -> Option<SettingChange>;

/// Explicit map from preference key to typed parser, built at construction
/// time. No reflection, no dynamic lookup.
pub struct SettingParser {
    handlers: HashMap<&'static str, Handler>,
}

impl SettingParser {
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Handler> = HashMap::new();
        handlers.insert(PREF_SIMULATE, |v| {
            v.parse().ok().map(SettingChange::Simulate)
        });
        handlers.insert(PREF_ACCURACY, |v| {
            v.parse::<f64>()
                .ok()
                .filter(|a| a.is_finite() && *a > 0.0)
                .map(SettingChange::MinAccuracy)
        });
        handlers.insert(PREF_ACCURACY_ALARM_TIME, |v| {
            v.parse::<u32>()
                .ok()
                .filter(|m| *m > 0)
                .map(SettingChange::AccuracyAlarmTime)
        });
        handlers.insert(PREF_MUTE, |v| {
            v.parse::<u32>()
                .ok()
                .filter(|m| *m > 0)
                .map(SettingChange::MuteTime)
        });
        handlers.insert(PREF_ALARM_TONE, |v| {
            Some(SettingChange::AlarmTone(v.to_string()))
        });
        handlers.insert(PREF_GPS_MAX_SLEEP, |v| {
            v.parse::<u32>()
                .ok()
                .filter(|s| *s > 0)
                .map(SettingChange::MaxGpsSleep)
        });
        handlers.insert(PREF_DISTANCE_UNIT, |v| {
            DistanceUnit::from_pref(v).map(SettingChange::DistanceUnit)
        });
        Self { handlers }
    }

    /// Parse a raw key/value pair into a typed change
    pub fn parse(&self, key: &str, value: &str) -> Result<SettingChange> {
        let handler = self
            .handlers
            .get(key)
            .ok_or_else(|| Error::UnknownSetting {
                key: key.to_string(),
            })?;
        handler(value).ok_or_else(|| Error::invalid_setting(key, value))
    }
}

impl Default for SettingParser {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File loading
// ─────────────────────────────────────────────────────────────────────────────

/// Default config path (`~/.config/boatwatch/config.toml`)
pub fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("boatwatch").join(CONFIG_FILENAME)
}

/// Load settings from a TOML file.
///
/// A missing file yields the defaults; a malformed file is logged and also
/// yields the defaults (recoverable-degrade).
pub fn load_settings(path: &Path) -> WatchSettings {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}, using defaults", path.display());
            return WatchSettings::default();
        }
        Err(e) => {
            warn!("failed to read config {}: {e}", path.display());
            return WatchSettings::default();
        }
    };
    match toml::from_str(&raw) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("malformed config {}: {e}", path.display());
            WatchSettings::default()
        }
    }
}

/// Write settings to a TOML file
pub fn save_settings(path: &Path, settings: &WatchSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = toml::to_string_pretty(settings).map_err(|e| Error::config(e.to_string()))?;
    std::fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = WatchSettings::default();
        assert!(!s.simulate);
        assert_eq!(s.mute_duration(), Duration::from_secs(300));
        assert_eq!(s.accuracy_alarm_duration(), Duration::from_secs(300));
        assert_eq!(s.max_sleep(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_typed_changes() {
        let parser = SettingParser::new();
        assert_eq!(
            parser.parse(PREF_SIMULATE, "true").unwrap(),
            SettingChange::Simulate(true)
        );
        assert_eq!(
            parser.parse(PREF_ACCURACY, "12.5").unwrap(),
            SettingChange::MinAccuracy(12.5)
        );
        assert_eq!(
            parser.parse(PREF_DISTANCE_UNIT, "ft").unwrap(),
            SettingChange::DistanceUnit(DistanceUnit::Feet)
        );
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        let parser = SettingParser::new();
        assert!(matches!(
            parser.parse(PREF_MUTE, "soon"),
            Err(Error::InvalidSetting { .. })
        ));
        assert!(matches!(
            parser.parse(PREF_ACCURACY, "-3"),
            Err(Error::InvalidSetting { .. })
        ));
        assert!(matches!(
            parser.parse("pref_bogus", "1"),
            Err(Error::UnknownSetting { .. })
        ));
    }

    #[test]
    fn test_malformed_value_keeps_last_known_good() {
        let parser = SettingParser::new();
        let mut settings = WatchSettings::default();
        settings.apply(&parser.parse(PREF_MUTE, "10").unwrap());
        assert_eq!(settings.mute_min, 10);

        // Rejected parse produces no change to apply
        assert!(parser.parse(PREF_MUTE, "never").is_err());
        assert_eq!(settings.mute_min, 10);
    }

    #[test]
    fn test_apply_all_changes() {
        let mut s = WatchSettings::default();
        s.apply(&SettingChange::Simulate(true));
        s.apply(&SettingChange::MinAccuracy(7.0));
        s.apply(&SettingChange::AccuracyAlarmTime(2));
        s.apply(&SettingChange::MuteTime(1));
        s.apply(&SettingChange::AlarmTone("bell".to_string()));
        s.apply(&SettingChange::MaxGpsSleep(120));
        s.apply(&SettingChange::DistanceUnit(DistanceUnit::Feet));
        assert!(s.simulate);
        assert_eq!(s.min_accuracy_m, 7.0);
        assert_eq!(s.accuracy_alarm_min, 2);
        assert_eq!(s.mute_min, 1);
        assert_eq!(s.alarm_tone, "bell");
        assert_eq!(s.max_gps_sleep_secs, 120);
        assert_eq!(s.distance_unit, DistanceUnit::Feet);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = load_settings(&tmp.path().join("nope.toml"));
        assert_eq!(settings, WatchSettings::default());
    }

    #[test]
    fn test_load_save_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut settings = WatchSettings::default();
        settings.simulate = true;
        settings.distance_unit = DistanceUnit::Feet;
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn test_load_malformed_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "simulate = maybe??").unwrap();
        assert_eq!(load_settings(&path), WatchSettings::default());
    }
}
