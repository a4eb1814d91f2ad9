use std::collections::BTreeMap;

use fiszki_core::{Category, CategoryId, LanguagePair, SyncMode};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::cli::{CategoryCommands, CompletionShell, SyncCommands, SyncModeArg, WordCommands};
use crate::commands::category::{category_update, run_category};
use crate::commands::common::{
    find_category, format_relative_time, open_coordinator, render_side, CliEnv,
};
use crate::commands::completions::render_completions;
use crate::commands::config::{apply_profile_init, ProfileInit};
use crate::commands::sync::run_sync;
use crate::commands::transfer::{run_export, run_import};
use crate::commands::word::{parse_word_lines, run_word};
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

fn test_env(dir: &TempDir, mode: SyncMode) -> CliEnv {
    let profile = CliProfile {
        sync_mode: Some(mode),
        ..CliProfile::default()
    };
    CliEnv::from_profile(
        "cli-test".to_string(),
        profile,
        Some(dir.path().join("fiszki.db")),
        Some(dir.path().join("state")),
    )
    .unwrap()
}

fn category(id: &str, name: &str) -> Category {
    Category {
        id: CategoryId::from(id.to_string()),
        name: name.to_string(),
        description: String::new(),
        language_pair: LanguagePair::default(),
        created_at: 0,
        updated_at: 0,
        word_count: 0,
    }
}

fn add_category(name: &str) -> CategoryCommands {
    CategoryCommands::Add {
        name: name.to_string(),
        description: String::new(),
        lang1: Some("English".to_string()),
        lang2: Some("French".to_string()),
    }
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn parse_word_lines_accepts_two_and_four_columns() {
    let input = "# travel words\nhello | bonjour\n\ncat | kat | chat | sha\n";
    let pairs = parse_word_lines(input).unwrap();

    assert_eq!(pairs.len(), 2);
    assert_eq!(render_side(&pairs[0].lang2), "bonjour");
    assert_eq!(render_side(&pairs[1].lang1), "cat [kat]");
    assert_eq!(render_side(&pairs[1].lang2), "chat [sha]");
}

#[test]
fn parse_word_lines_reports_line_numbers() {
    let err = parse_word_lines("hello | bonjour\none | two | three\n").unwrap_err();
    assert!(err.to_string().contains("line 2"));

    let err = parse_word_lines("hello | bonjour\n\n   | chat\n").unwrap_err();
    assert!(err.to_string().contains("line 3"));
}

#[test]
fn find_category_by_id_name_and_prefix() {
    let categories = vec![
        category("0190aaaa-1111", "Travel"),
        category("0190aaaa-2222", "Food"),
        category("0190bbbb-3333", "Animals"),
    ];

    assert_eq!(find_category(&categories, "0190aaaa-2222").unwrap().name, "Food");
    assert_eq!(find_category(&categories, "travel").unwrap().name, "Travel");
    assert_eq!(find_category(&categories, "0190bb").unwrap().name, "Animals");
    assert!(matches!(
        find_category(&categories, "0190aa"),
        Err(CliError::AmbiguousCategory(_))
    ));
    assert!(matches!(
        find_category(&categories, "Music"),
        Err(CliError::CategoryNotFound(_))
    ));
}

#[test]
fn category_update_keeps_other_language() {
    let current = LanguagePair::new("English", "French");
    let update = category_update(&current, None, None, None, Some("German".to_string()));
    assert_eq!(
        update.language_pair,
        Some(LanguagePair::new("English", "German"))
    );
    assert!(category_update(&current, None, None, None, None).is_empty());
}

#[test]
fn completions_mention_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("fiszki"));
}

#[test]
fn profile_init_merges_and_normalizes() {
    let mut config = CliProfilesConfig {
        version: 1,
        active_profile: None,
        profiles: BTreeMap::new(),
    };
    config.profile_mut_or_default("work").supabase_anon_key = Some("anon".to_string());

    apply_profile_init(
        &mut config,
        "work",
        ProfileInit {
            supabase_url: Some("https://demo.supabase.co/auth/v1/".to_string()),
            sync_mode: Some(SyncMode::Manual),
            activate: true,
            ..ProfileInit::default()
        },
    )
    .unwrap();

    let profile = config.profile("work").unwrap();
    assert_eq!(profile.supabase_url.as_deref(), Some("https://demo.supabase.co"));
    assert_eq!(profile.supabase_anon_key.as_deref(), Some("anon"));
    assert_eq!(profile.sync_mode, Some(SyncMode::Manual));
    assert_eq!(config.active_profile.as_deref(), Some("work"));

    let zero_interval = ProfileInit {
        auto_sync_interval_secs: Some(0),
        ..ProfileInit::default()
    };
    assert!(apply_profile_init(&mut config, "work", zero_interval).is_err());
}

#[test]
fn env_prefers_flags_over_profile_paths() {
    let profile = CliProfile {
        db_path: Some("/profile/fiszki.db".into()),
        state_dir: Some("/profile/state".into()),
        ..CliProfile::default()
    };
    let env = CliEnv::from_profile(
        "paths".to_string(),
        profile,
        Some("/flag/fiszki.db".into()),
        None,
    )
    .unwrap();

    assert_eq!(env.db_path, std::path::PathBuf::from("/flag/fiszki.db"));
    assert_eq!(env.state_dir, std::path::PathBuf::from("/profile/state"));
}

#[tokio::test(flavor = "multi_thread")]
async fn category_and_word_commands_update_local_store() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(&dir, SyncMode::OfflineOnly);

    run_category(add_category("Travel"), &env).await.unwrap();
    let words_file = dir.path().join("words.txt");
    std::fs::write(&words_file, "hello | bonjour\ncat | chat\n").unwrap();
    run_word(
        WordCommands::Import {
            category: "travel".to_string(),
            file: Some(words_file),
        },
        &env,
    )
    .await
    .unwrap();
    run_word(
        WordCommands::Add {
            category: "Travel".to_string(),
            word1: "dog".to_string(),
            word2: "chien".to_string(),
            pron1: String::new(),
            pron2: String::new(),
        },
        &env,
    )
    .await
    .unwrap();

    let coordinator = open_coordinator(&env).await.unwrap();
    let categories = coordinator.get_all_categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].word_count, 3);
    assert_eq!(
        categories[0].language_pair,
        LanguagePair::new("English", "French")
    );
    assert!(coordinator.pending_operations().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn export_then_import_restores_category() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(&dir, SyncMode::OfflineOnly);
    run_category(add_category("Travel"), &env).await.unwrap();
    run_word(
        WordCommands::Add {
            category: "Travel".to_string(),
            word1: "hello".to_string(),
            word2: "bonjour".to_string(),
            pron1: String::new(),
            pron2: "bon-ZHOOR".to_string(),
        },
        &env,
    )
    .await
    .unwrap();

    let export_path = dir.path().join("travel.json");
    run_export("Travel", Some(&export_path), &env).await.unwrap();
    run_category(
        CategoryCommands::Delete {
            category: "Travel".to_string(),
        },
        &env,
    )
    .await
    .unwrap();
    run_import(Some(&export_path), &env).await.unwrap();

    let coordinator = open_coordinator(&env).await.unwrap();
    let categories = coordinator.get_all_categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    let words = coordinator
        .get_words_by_category(&categories[0].id)
        .await
        .unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].lang2.pronunciation, "bon-ZHOOR");
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_category_name_is_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(&dir, SyncMode::OfflineOnly);
    run_category(add_category("Travel"), &env).await.unwrap();

    let err = run_category(add_category(" Travel "), &env).await.unwrap_err();
    assert!(matches!(
        err,
        CliError::Core(fiszki_core::Error::Conflict(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn writes_stay_queued_until_cloud_is_reachable() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(&dir, SyncMode::Auto);

    run_category(add_category("Travel"), &env).await.unwrap();

    let coordinator = open_coordinator(&env).await.unwrap();
    let names = coordinator
        .pending_operations()
        .iter()
        .map(|entry| entry.operation.name())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["create-category"]);
    assert!(!coordinator.sync_status().is_online);
    drop(coordinator);

    run_sync(Some(SyncCommands::ClearQueue), &env).await.unwrap();
    let coordinator = open_coordinator(&env).await.unwrap();
    assert!(coordinator.pending_operations().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_mode_persists_in_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(&dir, SyncMode::Auto);

    run_sync(
        Some(SyncCommands::Mode {
            mode: Some(SyncModeArg::OfflineOnly),
        }),
        &env,
    )
    .await
    .unwrap();

    let coordinator = open_coordinator(&env).await.unwrap();
    assert_eq!(coordinator.sync_mode(), SyncMode::OfflineOnly);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_run_requires_cloud_config() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(&dir, SyncMode::Auto);

    let err = run_sync(None, &env).await.unwrap_err();
    assert!(matches!(err, CliError::SyncNotConfigured));
}
