//! Background auto-sync driven by connectivity changes and a timer

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::coordinator::{SyncCoordinator, SyncOutcome};
use crate::models::SyncMode;
use crate::store::{FlashcardStore, MirrorStore};

/// Drive `coordinator` until `shutdown` resolves.
///
/// The current connectivity value is applied first, then every change is
/// forwarded to [`SyncCoordinator::handle_connectivity_change`]. Each
/// `period` tick runs a full sync while online in auto mode. Sync errors are
/// logged and the loop keeps going.
pub async fn run_auto_sync<L, R>(
    coordinator: &SyncCoordinator<L, R>,
    mut connectivity: watch::Receiver<bool>,
    period: Duration,
    shutdown: impl Future<Output = ()>,
) where
    L: MirrorStore,
    R: FlashcardStore,
{
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let online = *connectivity.borrow_and_update();
    log_result(coordinator.handle_connectivity_change(online).await);

    let mut watching = true;
    loop {
        tokio::select! {
            () = &mut shutdown => {
                tracing::debug!("Auto-sync loop stopping");
                break;
            }
            changed = connectivity.changed(), if watching => {
                if changed.is_err() {
                    tracing::debug!("Connectivity source closed; timer only from now on");
                    watching = false;
                    continue;
                }
                let online = *connectivity.borrow_and_update();
                log_result(coordinator.handle_connectivity_change(online).await);
            }
            _ = ticker.tick() => {
                let status = coordinator.sync_status();
                if status.is_online && status.mode == SyncMode::Auto {
                    log_result(coordinator.sync_all().await.map(Some));
                }
            }
        }
    }
}

fn log_result<T>(result: crate::Result<Option<SyncOutcome<T>>>) {
    match result {
        Ok(Some(SyncOutcome::Skipped(reason))) => {
            tracing::debug!("Auto-sync skipped: {reason:?}");
        }
        Ok(_) => {}
        Err(error) => tracing::warn!("Auto-sync failed: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LanguagePair, SyncSettings};
    use crate::store::{FailureKind, MemoryStore};
    use crate::sync::storage::MemoryStateStorage;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    fn coordinator(
        remote: &MemoryStore,
        mode: SyncMode,
    ) -> SyncCoordinator<MemoryStore, MemoryStore> {
        let settings = SyncSettings {
            default_mode: mode,
            ..SyncSettings::default()
        };
        SyncCoordinator::new(
            MemoryStore::new(),
            remote.clone(),
            Arc::new(MemoryStateStorage::new()),
            &settings,
        )
        .unwrap()
    }

    async fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..400 {
            if done() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        done()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reconnect_drains_queued_writes() {
        let remote = MemoryStore::with_numeric_ids();
        let coordinator = coordinator(&remote, SyncMode::Auto);
        coordinator
            .add_category("Travel", "", &LanguagePair::default())
            .await
            .unwrap();
        assert_eq!(coordinator.sync_status().queue_length, 1);

        let (online_tx, online_rx) = watch::channel(false);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let driver = async {
            online_tx.send(true).unwrap();
            let drained = wait_until(|| coordinator.sync_status().queue_length == 0).await;
            stop_tx.send(()).unwrap();
            drained
        };
        let shutdown = async {
            let _ = stop_rx.await;
        };

        let ((), drained) = tokio::join!(
            run_auto_sync(&coordinator, online_rx, Duration::from_secs(3600), shutdown),
            driver
        );

        assert!(drained);
        assert_eq!(remote.get_all_categories().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn timer_retries_while_online() {
        let remote = MemoryStore::with_numeric_ids();
        let coordinator = coordinator(&remote, SyncMode::Auto);
        let (_online_tx, online_rx) = watch::channel(true);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let driver = async {
            // Let the loop apply the initial online state.
            wait_until(|| coordinator.sync_status().is_online).await;
            remote.fail_with(FailureKind::Network);
            coordinator
                .add_category("Travel", "", &LanguagePair::default())
                .await
                .unwrap();
            assert_eq!(coordinator.sync_status().queue_length, 1);
            remote.heal();
            let drained = wait_until(|| coordinator.sync_status().queue_length == 0).await;
            stop_tx.send(()).unwrap();
            drained
        };
        let shutdown = async {
            let _ = stop_rx.await;
        };

        let ((), drained) = tokio::join!(
            run_auto_sync(&coordinator, online_rx, Duration::from_millis(20), shutdown),
            driver
        );

        assert!(drained);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn manual_mode_ignores_timer() {
        let remote = MemoryStore::with_numeric_ids();
        let coordinator = coordinator(&remote, SyncMode::Manual);
        let (_online_tx, online_rx) = watch::channel(true);
        let shutdown = tokio::time::sleep(Duration::from_millis(60));

        run_auto_sync(&coordinator, online_rx, Duration::from_millis(10), shutdown).await;

        assert!(coordinator.sync_status().is_online);
        assert_eq!(remote.call_count(), 0);
    }
}
