//! Integration tests for AutoSyncScheduler

mod common;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use lexsync_core::domain::{CachePolicy, ChangeKind, ConnectivityState};
use lexsync_sync::AutoSyncScheduler;

use common::{fast_options, harness, harness_on_file, harness_with, seed, Harness};

const DELAY: Duration = Duration::from_millis(60);

fn start(h: &Harness, enabled: bool) -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let shutdown = CancellationToken::new();
    let scheduler = AutoSyncScheduler::new(h.engine.clone(), enabled, DELAY);
    let handle = tokio::spawn(scheduler.run(shutdown.clone()));
    (shutdown, handle)
}

async fn queue_note(h: &Harness, record: lexsync_core::domain::RecordId) {
    h.engine
        .record_change(ChangeKind::CaseNote, record, serde_json::json!({"note": "n"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_burst_of_edits_syncs_once() {
    let h = harness().await;
    let id = seed(&h, "HC/2024/101").await;
    let (shutdown, handle) = start(&h, true);

    for _ in 0..3 {
        queue_note(&h, id).await;
        tokio::time::sleep(Duration::from_millis(15)).await;
    }
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(h.remote.push_count(), 3);
    assert_eq!(h.engine.pending_count(), 0);
    let state = h.engine.state().await;
    assert!(state.last_sync().is_some());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_no_auto_sync_while_offline() {
    let h = harness().await;
    let id = seed(&h, "HC/2024/102").await;
    h.engine.set_offline_mode(true).await.unwrap();
    let (shutdown, handle) = start(&h, true);

    queue_note(&h, id).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.remote.push_count(), 0);
    assert_eq!(h.engine.pending_count(), 1);

    // Leaving offline mode arms the scheduler again
    h.engine.set_offline_mode(false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.remote.push_count(), 1);
    assert_eq!(h.engine.pending_count(), 0);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_disabled_scheduler_never_syncs() {
    let h = harness().await;
    let id = seed(&h, "HC/2024/103").await;
    let (shutdown, handle) = start(&h, false);

    queue_note(&h, id).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.remote.push_count(), 0);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_network_transitions_are_announced() {
    let h = harness().await;
    let id = seed(&h, "HC/2024/104").await;
    let (shutdown, handle) = start(&h, true);
    tokio::time::sleep(Duration::from_millis(20)).await;

    h.connectivity.set_network(ConnectivityState::Offline);
    queue_note(&h, id).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.remote.push_count(), 0);

    h.connectivity.set_network(ConnectivityState::Online);
    tokio::time::sleep(Duration::from_millis(250)).await;

    let notes = h.notifier.in_category("connectivity");
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].title, "You are offline");
    assert_eq!(notes[1].title, "Back online");
    assert!(notes[1].body.contains("1 queued"));
    assert_eq!(h.remote.push_count(), 1);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_user_toggle_is_not_announced() {
    let h = harness().await;
    let (shutdown, handle) = start(&h, true);
    tokio::time::sleep(Duration::from_millis(20)).await;

    h.engine.set_offline_mode(true).await.unwrap();
    h.engine.set_offline_mode(false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.notifier.all().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_failed_passes_back_off_exponentially() {
    let mut options = fast_options();
    options.max_retries = 0;
    let h = harness_with(options, CachePolicy::default()).await;
    let id = seed(&h, "HC/2024/105").await;
    h.remote.reject(id);
    let (shutdown, handle) = start(&h, true);

    queue_note(&h, id).await;
    // Passes at ~1x, then ~2x and ~4x the delay after each failure
    tokio::time::sleep(DELAY * 7 + Duration::from_millis(150)).await;
    shutdown.cancel();
    handle.await.unwrap();

    let times = h.remote.push_times();
    assert!(times.len() >= 3, "only {} passes ran", times.len());
    let first_gap = times[1] - times[0];
    let second_gap = times[2] - times[1];
    assert!(first_gap >= DELAY * 2 - Duration::from_millis(10), "{:?}", first_gap);
    assert!(second_gap >= DELAY * 4 - Duration::from_millis(10), "{:?}", second_gap);
    assert!(second_gap > first_gap);
    assert_eq!(h.engine.pending_count(), 1);
}

#[tokio::test]
async fn test_refresh_picks_up_changes_from_another_process() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lexsync.db");
    let daemon = harness_on_file(&path).await;
    let cli = harness_on_file(&path).await;

    let shutdown = CancellationToken::new();
    let scheduler = AutoSyncScheduler::new(daemon.engine.clone(), true, DELAY)
        .with_refresh_interval(Duration::from_millis(50));
    let handle = tokio::spawn(scheduler.run(shutdown.clone()));

    let id = seed(&cli, "HC/2024/106").await;
    queue_note(&cli, id).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(daemon.remote.push_count(), 1);
    assert_eq!(cli.remote.push_count(), 0);
    assert!(cli.cache.restore().await.state.pending().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_scheduler_stops_on_shutdown() {
    let h = harness().await;
    let (shutdown, handle) = start(&h, true);

    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
}
