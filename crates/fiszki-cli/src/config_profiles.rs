//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fiszki_core::config::SupabaseConfig;
use fiszki_core::util::normalize_text_option;
use fiszki_core::{SyncMode, SyncSettings};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";
const APP_DIR_NAME: &str = "fiszki";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    /// Mode used until one has been persisted in the state directory
    #[serde(default)]
    pub sync_mode: Option<SyncMode>,
    #[serde(default)]
    pub auto_sync_interval_secs: Option<u64>,
}

const fn default_config_version() -> u32 {
    1
}

fn app_dir(base: Option<PathBuf>, what: &str) -> Result<PathBuf, String> {
    base.map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| format!("Failed to resolve CLI {what} directory"))
}

pub fn default_config_path() -> Result<PathBuf, String> {
    Ok(app_dir(dirs::config_dir(), "config")?.join(CONFIG_FILE_NAME))
}

/// Per-profile data directory holding the database and sync state
pub fn default_profile_dir(profile_name: &str) -> Result<PathBuf, String> {
    Ok(app_dir(dirs::data_dir(), "data")?.join(profile_name))
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn env_text(name: &str) -> Option<String> {
    normalize_text_option(std::env::var(name).ok())
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Explicit flag, then `FISZKI_PROFILE`, then the active profile.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(env_text("FISZKI_PROFILE").as_deref()) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        DEFAULT_PROFILE.to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn supabase_url(&self) -> Option<String> {
        normalize_text_option(self.supabase_url.clone())
    }

    pub fn supabase_anon_key(&self) -> Option<String> {
        normalize_text_option(self.supabase_anon_key.clone())
    }

    /// Apply `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `FISZKI_DB_PATH` and
    /// `FISZKI_STATE_DIR` on top of the stored values.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_text("SUPABASE_URL") {
            self.supabase_url = Some(url);
        }
        if let Some(key) = env_text("SUPABASE_ANON_KEY") {
            self.supabase_anon_key = Some(key);
        }
        if let Some(path) = env_text("FISZKI_DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = env_text("FISZKI_STATE_DIR") {
            self.state_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Supabase project for this profile; `None` runs local-only.
    pub fn supabase_config(&self) -> Result<Option<SupabaseConfig>, String> {
        SupabaseConfig::resolve(self.supabase_url(), self.supabase_anon_key())
            .map_err(|error| error.to_string())
    }

    pub fn sync_settings(&self) -> SyncSettings {
        let defaults = SyncSettings::default();
        SyncSettings {
            default_mode: self.sync_mode.unwrap_or(defaults.default_mode),
            auto_sync_interval_secs: self
                .auto_sync_interval_secs
                .unwrap_or(defaults.auto_sync_interval_secs),
        }
    }

    fn normalize(&mut self) {
        self.supabase_url = normalize_text_option(self.supabase_url.clone());
        self.supabase_anon_key = normalize_text_option(self.supabase_anon_key.clone());
    }
}
