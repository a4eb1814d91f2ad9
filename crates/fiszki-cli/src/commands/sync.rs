use std::time::Duration;

use fiszki_core::sync::{run_auto_sync, QueuedOperation, SyncOutcome};
use tokio::sync::watch;

use crate::cli::SyncCommands;
use crate::commands::common::{
    format_timestamp, open_coordinator, print_json, CliCoordinator, CliEnv,
};
use crate::error::CliError;

const PROBE_INTERVAL: Duration = Duration::from_secs(15);

pub async fn run_sync(command: Option<SyncCommands>, env: &CliEnv) -> Result<(), CliError> {
    let command = command.unwrap_or(SyncCommands::Run);
    let coordinator = open_coordinator(env).await?;
    match command {
        SyncCommands::Run => {
            env.require_supabase_config()?;
            match coordinator.sync_all().await? {
                SyncOutcome::Ran(report) => println!(
                    "Sync completed: {} categories, {} word pairs, {} queued operation(s) replayed",
                    report.categories, report.words, report.drained.replayed
                ),
                SyncOutcome::Skipped(reason) => println!("Sync skipped: {reason:?}"),
            }
        }
        SyncCommands::Status { json } => {
            let status = coordinator.sync_status();
            if json {
                print_json(&status)?;
            } else {
                let cloud = if env.supabase_config()?.is_some() {
                    "configured"
                } else {
                    "not configured"
                };
                println!("Profile:  {}", env.profile_name);
                println!("Cloud:    {cloud}");
                println!(
                    "Network:  {}",
                    if status.is_online { "online" } else { "offline" }
                );
                println!("Mode:     {}", status.mode);
                println!("Pending:  {}", status.queue_length);
            }
        }
        SyncCommands::Mode { mode } => match mode {
            Some(mode) => {
                coordinator.set_sync_mode(mode.into())?;
                println!("Sync mode set to {}", coordinator.sync_mode());
            }
            None => println!("{}", coordinator.sync_mode()),
        },
        SyncCommands::Drain => {
            env.require_supabase_config()?;
            match coordinator.drain_queue().await? {
                SyncOutcome::Ran(report) => println!(
                    "Replayed {} operation(s), {} failed, {} pending",
                    report.replayed, report.failed, report.remaining
                ),
                SyncOutcome::Skipped(reason) => println!("Drain skipped: {reason:?}"),
            }
        }
        SyncCommands::Queue { json } => {
            let pending = coordinator.pending_operations();
            if json {
                print_json(&pending)?;
            } else if pending.is_empty() {
                println!("No pending operations.");
            } else {
                for line in format_queue_lines(&pending) {
                    println!("{line}");
                }
            }
        }
        SyncCommands::ClearQueue => {
            let dropped = coordinator.clear_queue()?;
            println!("Discarded {dropped} pending operation(s)");
        }
        SyncCommands::Watch { interval } => {
            env.require_supabase_config()?;
            let period = interval.map_or_else(
                || env.profile.sync_settings().auto_sync_interval(),
                |secs| Duration::from_secs(secs.max(1)),
            );
            run_watch(&coordinator, period).await?;
        }
        SyncCommands::Migrate => {
            env.require_supabase_config()?;
            let report = coordinator.migrate_local_to_cloud().await?;
            println!(
                "Migrated {} categories and {} word pairs",
                report.categories, report.words
            );
            for name in &report.failed {
                println!("  failed: {name}");
            }
        }
    }
    coordinator.flush()?;
    Ok(())
}

pub fn format_queue_lines(pending: &[QueuedOperation]) -> Vec<String> {
    pending
        .iter()
        .map(|entry| {
            format!(
                "{:>4}  {:<32}  {}",
                entry.seq,
                entry.operation.name(),
                format_timestamp(entry.enqueued_at)
            )
        })
        .collect()
}

/// Probe the server in the background and sync until Ctrl-C.
async fn run_watch(coordinator: &CliCoordinator, period: Duration) -> Result<(), CliError> {
    let probe = coordinator
        .remote()
        .probe()
        .ok_or(CliError::SyncNotConfigured)?;
    let (online_tx, online_rx) = watch::channel(coordinator.sync_status().is_online);

    let prober = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PROBE_INTERVAL);
        loop {
            ticker.tick().await;
            let reachable = probe.is_reachable().await;
            online_tx.send_if_modified(|online| {
                let changed = *online != reachable;
                *online = reachable;
                changed
            });
            if online_tx.is_closed() {
                break;
            }
        }
    });

    println!("Watching for changes every {}s; press Ctrl-C to stop", period.as_secs());
    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {error}");
        }
    };
    run_auto_sync(coordinator, online_rx, period, shutdown).await;

    prober.abort();
    println!("Stopped watching");
    Ok(())
}
