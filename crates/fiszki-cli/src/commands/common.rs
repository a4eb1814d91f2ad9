use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use fiszki_core::config::SupabaseConfig;
use fiszki_core::remote::SupabaseStore;
use fiszki_core::sync::{FileStateStorage, SyncCoordinator};
use fiszki_core::{Category, LocalStore, WordPair, WordSide};
use serde::Serialize;

use crate::auth::SessionStore;
use crate::config_profiles::{default_profile_dir, CliProfile, CliProfilesConfig};
use crate::error::CliError;

const DB_FILE_NAME: &str = "fiszki.db";
const STATE_DIR_NAME: &str = "state";
const SHORT_ID_LEN: usize = 13;

pub type CliCoordinator = SyncCoordinator<LocalStore, SupabaseStore<SessionStore>>;

/// Everything a command needs to know about where its data lives
#[derive(Debug, Clone)]
pub struct CliEnv {
    pub profile_name: String,
    pub profile: CliProfile,
    pub db_path: PathBuf,
    pub state_dir: PathBuf,
}

impl CliEnv {
    /// Resolve from flags, the stored profile and environment overrides.
    pub fn resolve(
        db_path: Option<PathBuf>,
        state_dir: Option<PathBuf>,
        profile: Option<&str>,
    ) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = config.resolve_profile_name(profile);
        let profile = config
            .profile(&profile_name)
            .cloned()
            .unwrap_or_default()
            .with_env_overrides();
        Self::from_profile(profile_name, profile, db_path, state_dir)
    }

    /// Flags win over profile values; profile values win over the data directory.
    pub fn from_profile(
        profile_name: String,
        profile: CliProfile,
        db_path: Option<PathBuf>,
        state_dir: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let db_path = match db_path.or_else(|| profile.db_path.clone()) {
            Some(path) => path,
            None => default_profile_dir(&profile_name)
                .map_err(CliError::Config)?
                .join(DB_FILE_NAME),
        };
        let state_dir = match state_dir.or_else(|| profile.state_dir.clone()) {
            Some(dir) => dir,
            None => default_profile_dir(&profile_name)
                .map_err(CliError::Config)?
                .join(STATE_DIR_NAME),
        };
        Ok(Self {
            profile_name,
            profile,
            db_path,
            state_dir,
        })
    }

    pub fn supabase_config(&self) -> Result<Option<SupabaseConfig>, CliError> {
        self.profile.supabase_config().map_err(CliError::Config)
    }

    pub fn require_supabase_config(&self) -> Result<SupabaseConfig, CliError> {
        self.supabase_config()?.ok_or(CliError::SyncNotConfigured)
    }

    fn remote_store(&self) -> Result<SupabaseStore<SessionStore>, CliError> {
        match self.supabase_config()? {
            Some(config) => Ok(SupabaseStore::new(
                &config,
                SessionStore::for_profile(&self.profile_name),
            )?),
            None => Ok(SupabaseStore::unconfigured()),
        }
    }
}

/// Open both stores and the persisted sync state, then run startup sync.
pub async fn open_coordinator(env: &CliEnv) -> Result<CliCoordinator, CliError> {
    let local = LocalStore::open_path(env.db_path.clone()).await?;
    let remote = env.remote_store()?;
    let storage = FileStateStorage::open(env.state_dir.clone())?;
    let coordinator = SyncCoordinator::new(
        local,
        remote,
        Arc::new(storage),
        &env.profile.sync_settings(),
    )?;

    let online = coordinator.init().await?;
    tracing::debug!(
        "Opened profile '{}' ({})",
        env.profile_name,
        if online { "online" } else { "offline" }
    );
    Ok(coordinator)
}

#[derive(Debug, Serialize)]
pub struct CategoryListItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub lang1: String,
    pub lang2: String,
    pub word_count: usize,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

/// Find a category by exact ID, name (case-insensitive) or unique ID prefix.
pub async fn resolve_category(
    coordinator: &CliCoordinator,
    query: &str,
) -> Result<Category, CliError> {
    let query = normalize_identifier(query, "Category")?;
    let categories = coordinator.get_all_categories().await?;
    find_category(&categories, &query).cloned()
}

pub fn find_category<'a>(categories: &'a [Category], query: &str) -> Result<&'a Category, CliError> {
    if let Some(category) = categories.iter().find(|c| c.id.as_str() == query) {
        return Ok(category);
    }

    let by_name = categories
        .iter()
        .filter(|c| c.name.eq_ignore_ascii_case(query))
        .collect::<Vec<_>>();
    if let [category] = by_name.as_slice() {
        return Ok(category);
    }

    let by_prefix = categories
        .iter()
        .filter(|c| c.id.as_str().starts_with(query))
        .collect::<Vec<_>>();
    match by_prefix.as_slice() {
        [] => Err(CliError::CategoryNotFound(query.to_string())),
        [category] => Ok(category),
        matches => {
            let options = matches
                .iter()
                .take(3)
                .map(|c| short_id(c.id.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousCategory(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_identifier(value: &str, what: &str) -> Result<String, CliError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CliError::InvalidInput(format!("{what} ID cannot be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn format_category_lines(categories: &[Category]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    categories
        .iter()
        .map(|category| {
            let languages = format!(
                "{} / {}",
                category.language_pair.lang1, category.language_pair.lang2
            );
            format!(
                "{:<13}  {:<24}  {:<28}  {:>5} words  {}",
                short_id(category.id.as_str()),
                category.name,
                languages,
                category.word_count,
                format_relative_time(category.updated_at, now_ms)
            )
        })
        .collect()
}

pub fn category_to_list_item(category: &Category) -> CategoryListItem {
    let now_ms = Utc::now().timestamp_millis();
    CategoryListItem {
        id: category.id.to_string(),
        name: category.name.clone(),
        description: category.description.clone(),
        lang1: category.language_pair.lang1.clone(),
        lang2: category.language_pair.lang2.clone(),
        word_count: category.word_count,
        created_at: category.created_at,
        updated_at: category.updated_at,
        relative_time: format_relative_time(category.updated_at, now_ms),
    }
}

pub fn render_side(side: &WordSide) -> String {
    if side.pronunciation.is_empty() {
        side.word.clone()
    } else {
        format!("{} [{}]", side.word, side.pronunciation)
    }
}

pub fn format_word_lines(words: &[WordPair]) -> Vec<String> {
    words
        .iter()
        .map(|word| {
            format!(
                "{:<13}  {:<32}  {}",
                short_id(word.id.as_str()),
                render_side(&word.lang1),
                render_side(&word.lang2)
            )
        })
        .collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Read a whole file, or piped stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    if let Some(path) = path {
        return Ok(std::fs::read_to_string(path)?);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::InvalidInput(
            "no input: pass a file path or pipe data on stdin".to_string(),
        ));
    }
    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(buffer)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
