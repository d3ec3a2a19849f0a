#[path = "support/gateway_harness.rs"]
mod gateway_harness;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tempfile::TempDir;

use gateway_harness::{CHAT, RecordingGateway, THREAD, engine_with, snapshot_store, t0};
use topic_janitor::retention::{
    MessageRef, RetentionPolicy, SweepSettings, TopicKey, run_sweep_loop, sweep_once,
};
use topic_janitor::transport::DeleteOutcome;

fn topic() -> TopicKey {
    TopicKey::new(CHAT, THREAD)
}

fn msg(id: i64) -> MessageRef {
    MessageRef::new(CHAT, id, THREAD)
}

#[tokio::test]
async fn count_cap_evicts_only_the_oldest() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    let engine = engine_with(&tmp, &gateway);
    engine.apply_policy_command(topic(), Some(0), Some(2)).await;

    let mut evicted = Vec::new();
    for id in 1..=3 {
        let outcome = engine.on_message_arrived(msg(id), t0()).await;
        evicted.extend(outcome.evictions.into_iter().map(|report| report.message));
    }

    assert_eq!(evicted, vec![msg(1)]);
    assert_eq!(gateway.deleted_ids(), vec![1]);
    let state = engine.snapshot().await;
    assert_eq!(state.windows.window(topic()), vec![msg(2), msg(3)]);
    assert!(state.schedule.is_empty());
}

#[tokio::test]
async fn window_never_exceeds_cap_over_many_arrivals() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    let engine = engine_with(&tmp, &gateway);
    engine.apply_policy_command(topic(), None, Some(4)).await;

    for id in 1..=25 {
        engine.on_message_arrived(msg(id), t0()).await;
        assert!(engine.snapshot().await.windows.window(topic()).len() <= 4);
    }

    assert_eq!(gateway.deleted_ids(), (1..=21).collect::<Vec<_>>());
}

#[tokio::test]
async fn redelivered_arrival_keeps_window_distinct_across_restart() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    let engine = engine_with(&tmp, &gateway);
    engine.apply_policy_command(topic(), Some(10), Some(3)).await;

    engine.on_message_arrived(msg(1), t0()).await;
    engine.on_message_arrived(msg(2), t0()).await;
    engine.on_message_arrived(msg(1), t0()).await;

    let window = engine.snapshot().await.windows.window(topic());
    assert_eq!(window, vec![msg(1), msg(2)]);
    assert_eq!(engine.snapshot().await.schedule.len(), 2);

    let reloaded = snapshot_store(&tmp).load().unwrap();
    assert_eq!(reloaded.windows.window(topic()), window);

    // The cap still counts distinct messages after the restart.
    let engine = engine_with(&tmp, &gateway);
    engine.on_message_arrived(msg(3), t0()).await;
    assert!(gateway.deleted_ids().is_empty());
    let evicted = engine.on_message_arrived(msg(4), t0()).await.evictions;
    assert_eq!(evicted.len(), 1);
    assert_eq!(evicted[0].message, msg(1));
    assert_eq!(
        engine.snapshot().await.windows.window(topic()),
        vec![msg(2), msg(3), msg(4)]
    );
}

#[tokio::test]
async fn time_policy_expires_after_deadline_only() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    let engine = engine_with(&tmp, &gateway);
    engine.apply_policy_command(topic(), Some(10), Some(0)).await;
    engine.on_message_arrived(msg(1), t0()).await;

    let early = sweep_once(&engine, t0() + Duration::minutes(5), 50).await;
    assert_eq!(early.attempted, 0);
    assert!(gateway.deleted_ids().is_empty());

    let late = sweep_once(&engine, t0() + Duration::minutes(11), 50).await;
    assert_eq!(late.attempted, 1);
    assert_eq!(late.deleted, 1);
    assert_eq!(gateway.deleted_ids(), vec![1]);
    assert!(!engine.is_scheduled(&msg(1)).await);
}

#[tokio::test]
async fn pinned_message_is_never_deleted() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    let engine = engine_with(&tmp, &gateway);
    engine.apply_policy_command(topic(), Some(1), Some(2)).await;

    engine.on_message_arrived(msg(1), t0()).await;
    engine.on_message_pinned(msg(1)).await;
    engine.on_message_arrived(msg(2), t0()).await;
    engine.on_message_arrived(msg(3), t0()).await;

    sweep_once(&engine, t0() + Duration::days(30), 50).await;

    assert!(!gateway.deleted_ids().contains(&1));
    assert_eq!(gateway.deleted_ids(), vec![2, 3]);
}

#[tokio::test]
async fn failed_deletes_still_clear_bookkeeping() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    gateway.fail_delete(1, DeleteOutcome::NotFound);
    gateway.fail_delete(2, DeleteOutcome::Failed("429: Too Many Requests".into()));
    let engine = engine_with(&tmp, &gateway);
    engine.apply_policy_command(topic(), Some(1), None).await;
    for id in 1..=3 {
        engine.on_message_arrived(msg(id), t0()).await;
    }

    let report = sweep_once(&engine, t0() + Duration::minutes(2), 50).await;
    assert_eq!(report.attempted, 3);
    assert_eq!(report.already_gone, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.deleted, 1);
    assert!(engine.snapshot().await.schedule.is_empty());
}

#[tokio::test]
async fn sweep_batch_is_bounded() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    let engine = engine_with(&tmp, &gateway);
    engine.apply_policy_command(topic(), Some(1), None).await;
    for id in 1..=7 {
        engine
            .on_message_arrived(msg(id), t0() + Duration::seconds(id))
            .await;
    }

    let first = sweep_once(&engine, t0() + Duration::hours(1), 3).await;
    assert_eq!(first.attempted, 3);
    assert_eq!(gateway.deleted_ids(), vec![1, 2, 3]);
    assert_eq!(engine.snapshot().await.schedule.len(), 4);
}

#[tokio::test]
async fn state_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    {
        let engine = engine_with(&tmp, &gateway);
        engine.apply_policy_command(topic(), Some(10), Some(5)).await;
        engine.on_message_arrived(msg(1), t0()).await;
        engine.on_message_arrived(msg(2), t0()).await;
    }

    let reloaded = snapshot_store(&tmp).load().unwrap();
    assert_eq!(reloaded.policies.get(topic()), RetentionPolicy::new(10, 5));
    assert_eq!(reloaded.schedule.len(), 2);
    assert_eq!(reloaded.windows.window(topic()), vec![msg(1), msg(2)]);

    let engine = engine_with(&tmp, &gateway);
    let report = sweep_once(&engine, t0() + Duration::minutes(10), 50).await;
    assert_eq!(report.attempted, 2);
    assert_eq!(engine.snapshot().await.windows.tracked_count(), 0);
    assert!(snapshot_store(&tmp).load().unwrap().schedule.is_empty());
}

#[tokio::test]
async fn main_stream_topic_round_trips() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    let engine = engine_with(&tmp, &gateway);
    let main = TopicKey::new(CHAT, 0);
    engine.apply_policy_command(main, Some(3), Some(1)).await;
    engine
        .on_message_arrived(MessageRef::new(CHAT, 50, 0), t0())
        .await;

    let reloaded = snapshot_store(&tmp).load().unwrap();
    assert_eq!(reloaded, engine.snapshot().await);
    assert_eq!(reloaded.windows.window(main).len(), 1);
}

#[tokio::test]
async fn sweep_loop_exits_on_shutdown_signal() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    let engine = engine_with(&tmp, &gateway);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let handle = tokio::spawn(run_sweep_loop(
        Arc::clone(&engine),
        SweepSettings {
            interval: StdDuration::from_secs(3600),
            batch_limit: 50,
        },
        shutdown_rx,
    ));

    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(StdDuration::from_secs(2), handle)
        .await
        .expect("sweep loop should exit within 2 seconds")
        .expect("sweep loop should not panic");
}

#[tokio::test]
async fn sweep_loop_deletes_overdue_entries_on_first_tick() {
    let tmp = TempDir::new().unwrap();
    let gateway = RecordingGateway::new();
    let engine = engine_with(&tmp, &gateway);
    engine.apply_policy_command(topic(), Some(1), None).await;
    // Arrival long in the past, so the entry is already overdue.
    engine
        .on_message_arrived(msg(1), chrono::Utc::now() - Duration::hours(1))
        .await;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(run_sweep_loop(
        Arc::clone(&engine),
        SweepSettings {
            interval: StdDuration::from_millis(20),
            batch_limit: 50,
        },
        shutdown_rx,
    ));

    tokio::time::sleep(StdDuration::from_millis(200)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(gateway.deleted_ids(), vec![1]);
    assert!(engine.snapshot().await.schedule.is_empty());
}
