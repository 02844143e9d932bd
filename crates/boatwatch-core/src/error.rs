//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Persistence Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read watch snapshot: {path}: {reason}")]
    SnapshotRead { path: PathBuf, reason: String },

    #[error("Failed to write watch snapshot: {path}: {reason}")]
    SnapshotWrite { path: PathBuf, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Fix Source Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Fix source error: {message}")]
    FixSource { message: String },

    // ─────────────────────────────────────────────────────────────
    // Alarm Resource Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Alarm audio error: {message}")]
    AlarmAudio { message: String },

    #[error("No alarm tone configured")]
    NoAlarmTone,

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown setting key: {key}")]
    UnknownSetting { key: String },

    #[error("Invalid value for setting {key}: {value}")]
    InvalidSetting { key: String, value: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn fix_source(message: impl Into<String>) -> Self {
        Self::FixSource {
            message: message.into(),
        }
    }

    pub fn alarm_audio(message: impl Into<String>) -> Self {
        Self::AlarmAudio {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    pub fn invalid_setting(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Check if this is a recoverable error.
    ///
    /// Nothing in the watch subsystem is fatal to the process: persistence
    /// read failures fall back to a fresh state, audio failures leave the
    /// alarm running silently, malformed settings keep the previous value.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SnapshotRead { .. }
                | Error::AlarmAudio { .. }
                | Error::NoAlarmTone
                | Error::UnknownSetting { .. }
                | Error::InvalidSetting { .. }
                | Error::FixSource { .. }
                | Error::ChannelSend { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
