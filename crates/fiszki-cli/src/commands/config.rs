use std::env;

use fiszki_core::config::SupabaseConfig;
use fiszki_core::util::normalize_text_option;
use fiszki_core::SyncMode;

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Values passed to `config init`
#[derive(Debug, Clone, Default)]
pub struct ProfileInit {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub sync_mode: Option<SyncMode>,
    pub auto_sync_interval_secs: Option<u64>,
    pub activate: bool,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            sync_mode,
            auto_sync_interval,
            no_activate,
        } => {
            let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let init = ProfileInit {
                supabase_url: normalize_text_option(supabase_url)
                    .or_else(|| normalize_text_option(env::var("SUPABASE_URL").ok())),
                supabase_anon_key: normalize_text_option(supabase_anon_key)
                    .or_else(|| normalize_text_option(env::var("SUPABASE_ANON_KEY").ok())),
                sync_mode: sync_mode.map(Into::into),
                auto_sync_interval_secs: auto_sync_interval,
                activate: !no_activate,
            };
            apply_profile_init(&mut config, &profile_name, init)?;

            let path = config.save().map_err(CliError::Config)?;
            println!(
                "Profile '{}' initialized at {}",
                profile_name,
                path.display()
            );
            let profile = config
                .profile(&profile_name)
                .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
            print_profile_summary(&profile_name, profile);
            Ok(())
        }
    }
}

/// Merge `init` into the named profile; unspecified values keep their stored value.
pub fn apply_profile_init(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    init: ProfileInit,
) -> Result<(), CliError> {
    let mut profile = config.profile(profile_name).cloned().unwrap_or_default();
    if let Some(url) = init.supabase_url {
        profile.supabase_url = Some(url);
    }
    if let Some(key) = init.supabase_anon_key {
        profile.supabase_anon_key = Some(key);
    }
    if let Some(mode) = init.sync_mode {
        profile.sync_mode = Some(mode);
    }
    if let Some(secs) = init.auto_sync_interval_secs {
        if secs == 0 {
            return Err(CliError::Config(
                "auto sync interval must be at least 1 second".to_string(),
            ));
        }
        profile.auto_sync_interval_secs = Some(secs);
    }

    // Store the normalized project URL so later runs need no fix-ups.
    if let Some(supabase) = profile.supabase_config().map_err(CliError::Config)? {
        profile.supabase_url = Some(supabase.url);
        profile.supabase_anon_key = Some(supabase.anon_key);
    }

    *config.profile_mut_or_default(profile_name) = profile;
    if init.activate {
        config.active_profile = Some(profile_name.to_string());
    }
    Ok(())
}

fn print_profile_summary(profile_name: &str, profile: &CliProfile) {
    match profile.supabase_config() {
        Ok(Some(SupabaseConfig { url, .. })) => println!(
            "Cloud sync via {url} is ready. Run `fiszki auth login --email <email> --password <password>`."
        ),
        _ => println!(
            "Profile '{profile_name}' runs local-only; pass --supabase-url and --supabase-anon-key to enable cloud sync."
        ),
    }
    let settings = profile.sync_settings();
    println!(
        "Sync mode {} (used until changed with `fiszki sync mode`), auto sync every {}s",
        settings.default_mode, settings.auto_sync_interval_secs
    );
}
