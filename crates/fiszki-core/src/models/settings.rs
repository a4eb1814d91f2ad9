//! Sync settings model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// How the coordinator propagates writes to the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Write through and resync whenever connectivity returns
    #[default]
    Auto,
    /// Write through, resync only when asked
    Manual,
    /// Never touch the remote store
    OfflineOnly,
}

impl SyncMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::OfflineOnly => "offline-only",
        }
    }

    /// Whether remote calls are allowed at all in this mode
    pub const fn allows_remote(self) -> bool {
        !matches!(self, Self::OfflineOnly)
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            "offline-only" | "offline_only" | "offline" => Ok(Self::OfflineOnly),
            other => Err(Error::Validation(format!(
                "unknown sync mode '{other}' (expected auto, manual or offline-only)"
            ))),
        }
    }
}

/// Default period between automatic sync passes.
pub const DEFAULT_AUTO_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Sync behaviour knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Mode used when nothing has been persisted yet
    pub default_mode: SyncMode,
    /// Seconds between periodic sync passes in auto mode
    pub auto_sync_interval_secs: u64,
}

impl SyncSettings {
    /// Interval as a `Duration`, never shorter than one second
    #[must_use]
    pub fn auto_sync_interval(&self) -> Duration {
        Duration::from_secs(self.auto_sync_interval_secs.max(1))
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_mode: SyncMode::Auto,
            auto_sync_interval_secs: DEFAULT_AUTO_SYNC_INTERVAL.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = SyncSettings::default();
        assert_eq!(settings.default_mode, SyncMode::Auto);
        assert_eq!(settings.auto_sync_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_sync_mode_serializes_kebab_case() {
        let json = serde_json::to_string(&SyncMode::OfflineOnly).unwrap();
        assert_eq!(json, "\"offline-only\"");
        let parsed: SyncMode = serde_json::from_str("\"manual\"").unwrap();
        assert_eq!(parsed, SyncMode::Manual);
    }

    #[test]
    fn test_sync_mode_parse() {
        assert_eq!("Offline-Only".parse::<SyncMode>().unwrap(), SyncMode::OfflineOnly);
        assert!("sometimes".parse::<SyncMode>().is_err());
        assert!(!SyncMode::OfflineOnly.allows_remote());
        assert!(SyncMode::Manual.allows_remote());
    }

    #[test]
    fn test_zero_interval_clamped() {
        let settings = SyncSettings {
            auto_sync_interval_secs: 0,
            ..SyncSettings::default()
        };
        assert_eq!(settings.auto_sync_interval(), Duration::from_secs(1));
    }
}
