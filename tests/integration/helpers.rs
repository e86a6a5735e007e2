//! Helper functions for integration tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vigil::alerts::AlertDispatcher;
use vigil::notify::{EmailTransport, Notifier, SmsTransport};
use vigil::scheduler::{MemoryTransitionTracker, MonitorContext, Recipients};
use vigil::store::{MemoryAlertStore, MemoryDeviceStore, MemoryLogStore};
use vigil::{CheckProtocol, Device, DeviceKind};
use wiremock::MockServer;

/// Email transport that records every send and always succeeds.
#[derive(Clone, Default)]
pub struct RecordingEmail {
    pub sent: Arc<Mutex<Vec<(String, String, String)>>>,
}

#[async_trait]
impl EmailTransport for RecordingEmail {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        true
    }
}

/// SMS transport that records every send and always succeeds.
#[derive(Clone, Default)]
pub struct RecordingSms {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl SmsTransport for RecordingSms {
    async fn send(&self, to: &str, body: &str) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        true
    }
}

/// All the shared state an end-to-end monitoring test needs to inspect.
pub struct TestEnv {
    pub ctx: MonitorContext,
    pub device_store: Arc<MemoryDeviceStore>,
    pub log_store: Arc<MemoryLogStore>,
    pub alert_store: Arc<MemoryAlertStore>,
    pub email: RecordingEmail,
    pub sms: RecordingSms,
}

pub fn test_env(recipients: Recipients) -> TestEnv {
    let device_store = Arc::new(MemoryDeviceStore::new());
    let log_store = Arc::new(MemoryLogStore::new());
    let alert_store = Arc::new(MemoryAlertStore::new());
    let email = RecordingEmail::default();
    let sms = RecordingSms::default();

    let notifier = Notifier::new(Some(Box::new(email.clone())), Some(Box::new(sms.clone())));
    let dispatcher = Arc::new(AlertDispatcher::new(alert_store.clone(), notifier));

    let ctx = MonitorContext {
        device_store: device_store.clone(),
        log_store: log_store.clone(),
        tracker: Arc::new(MemoryTransitionTracker::new()),
        dispatcher,
        recipients,
    };

    TestEnv {
        ctx,
        device_store,
        log_store,
        alert_store,
        email,
        sms,
    }
}

pub fn email_recipients() -> Recipients {
    Recipients {
        email: Some("ops@example.com".to_string()),
        phone: None,
    }
}

pub fn both_recipients() -> Recipients {
    Recipients {
        email: Some("ops@example.com".to_string()),
        phone: Some("+244900000001".to_string()),
    }
}

/// A device whose HTTP check targets the given mock server.
pub fn device_for_server(name: &str, server: &MockServer) -> Device {
    let uri = url::Url::parse(&server.uri()).unwrap();
    Device::create(
        name,
        DeviceKind::Api,
        uri.host_str().unwrap(),
        uri.port(),
        CheckProtocol::Http,
        60,
        2000,
        "user-1",
    )
}
