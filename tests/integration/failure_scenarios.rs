//! Failure scenario tests
//!
//! These tests verify graceful degradation:
//! - Unreachable endpoints resolve to offline, never to a crash
//! - Devices with an unrecognized protocol go offline without I/O
//! - Transitions with no recipients configured are logged but not dispatched
//! - Store contents stay consistent across repeated failures

use vigil::config::RetentionConfig;
use vigil::scheduler::{MonitoringScheduler, Recipients};
use vigil::store::{DeviceStore, LogStore};
use vigil::{CheckProtocol, Device, DeviceKind, DeviceStatus};

use super::helpers::*;

/// Bind and immediately drop a listener so the port is closed.
async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_unreachable_endpoint_goes_offline() {
    let env = test_env(email_recipients());
    let device = Device::create(
        "dead-api",
        DeviceKind::Api,
        "127.0.0.1",
        Some(closed_port().await),
        CheckProtocol::Http,
        60,
        1000,
        "user-1",
    );
    env.device_store.insert(device.clone()).await;

    let mut scheduler = MonitoringScheduler::new(env.ctx, RetentionConfig::default());
    scheduler.start().await.unwrap();
    scheduler.handle(&device.id).unwrap().check_now().await.unwrap();

    let stored = env.device_store.find_by_id(&device.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DeviceStatus::Offline);

    let logs = env.log_store.find_by_device(&device.id, None).await.unwrap();
    assert!(logs[0].error_message.is_some());

    scheduler.stop().await;
}

#[tokio::test]
async fn test_unknown_protocol_goes_offline_without_io() {
    let env = test_env(email_recipients());
    let device = Device::create(
        "mystery-box",
        DeviceKind::Service,
        "somewhere.internal",
        None,
        CheckProtocol::Unknown,
        60,
        5000,
        "user-1",
    );
    env.device_store.insert(device.clone()).await;

    let mut scheduler = MonitoringScheduler::new(env.ctx, RetentionConfig::default());
    scheduler.start().await.unwrap();

    let started = std::time::Instant::now();
    scheduler.handle(&device.id).unwrap().check_now().await.unwrap();
    assert!(
        started.elapsed().as_millis() < 500,
        "unknown protocol must not attempt network I/O"
    );

    let stored = env.device_store.find_by_id(&device.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DeviceStatus::Offline);

    scheduler.stop().await;
}

#[tokio::test]
async fn test_transition_without_recipients_is_not_dispatched() {
    let env = test_env(Recipients::default());
    let device = Device::create(
        "dead-api",
        DeviceKind::Api,
        "127.0.0.1",
        Some(closed_port().await),
        CheckProtocol::Http,
        60,
        1000,
        "user-1",
    );
    env.device_store.insert(device.clone()).await;
    env.ctx.tracker.record(&device.id, DeviceStatus::Online).await;

    let mut scheduler = MonitoringScheduler::new(env.ctx, RetentionConfig::default());
    scheduler.start().await.unwrap();
    scheduler.handle(&device.id).unwrap().check_now().await.unwrap();

    // The transition happened but nobody was there to tell
    assert!(env.alert_store.all().await.is_empty());
    assert!(env.email.sent.lock().unwrap().is_empty());
    assert!(env.sms.sent.lock().unwrap().is_empty());

    scheduler.stop().await;
}

#[tokio::test]
async fn test_repeated_failures_accumulate_logs_not_alerts() {
    let env = test_env(email_recipients());
    let device = Device::create(
        "flaky",
        DeviceKind::Service,
        "somewhere.internal",
        None,
        CheckProtocol::Unknown,
        60,
        5000,
        "user-1",
    );
    env.device_store.insert(device.clone()).await;
    env.ctx.tracker.record(&device.id, DeviceStatus::Online).await;

    let mut scheduler = MonitoringScheduler::new(env.ctx, RetentionConfig::default());
    scheduler.start().await.unwrap();
    let handle = scheduler.handle(&device.id).unwrap().clone();

    for _ in 0..3 {
        handle.check_now().await.unwrap();
    }

    let logs = env.log_store.find_by_device(&device.id, None).await.unwrap();
    assert!(logs.len() >= 3);

    let alerts = env.alert_store.all().await;
    assert_eq!(alerts.len(), 1, "only the first failure raises an alert");

    scheduler.stop().await;
}
