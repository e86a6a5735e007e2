//! Alert entity and dispatch
//!
//! An alert is a persisted notification event with its own delivery
//! lifecycle: `pending → sent | failed`, terminal. The dispatcher persists
//! the pending record before any delivery attempt so the event is never
//! silently lost, then updates the record once with the outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::notify::Notifier;
use crate::store::AlertStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Down,
    Up,
    Warning,
    SlowResponse,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Down => write!(f, "down"),
            AlertKind::Up => write!(f, "up"),
            AlertKind::Warning => write!(f, "warning"),
            AlertKind::SlowResponse => write!(f, "slow_response"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertChannel {
    Email,
    Sms,
    Both,
}

/// Delivery status. Monotonic: once sent or failed, never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Pending => write!(f, "pending"),
            AlertStatus::Sent => write!(f, "sent"),
            AlertStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A persisted notification event.
///
/// The device name is denormalized so the alert survives device deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub device_id: String,
    pub device_name: String,
    pub kind: AlertKind,
    pub message: String,
    pub channel: AlertChannel,
    pub status: AlertStatus,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Build a pending alert with its message rendered from the per-kind
    /// template. Rendering is deterministic: identical inputs produce
    /// identical text.
    pub fn create(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        kind: AlertKind,
        channel: AlertChannel,
        recipient_email: Option<String>,
        recipient_phone: Option<String>,
    ) -> Self {
        let device_name = device_name.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            device_id: device_id.into(),
            message: Self::render_message(kind, &device_name),
            device_name,
            kind,
            channel,
            status: AlertStatus::Pending,
            recipient_email,
            recipient_phone,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    /// The fixed message template for an alert kind with the device name
    /// interpolated.
    pub fn render_message(kind: AlertKind, device_name: &str) -> String {
        match kind {
            AlertKind::Down => format!("🚨 ALERT: device \"{device_name}\" is OFFLINE!"),
            AlertKind::Up => format!("✅ RECOVERED: device \"{device_name}\" is back ONLINE!"),
            AlertKind::Warning => {
                format!("⚠️ WARNING: device \"{device_name}\" is reporting anomalies.")
            }
            AlertKind::SlowResponse => {
                format!("🐢 SLOW: device \"{device_name}\" is responding slowly.")
            }
        }
    }

    /// Transition to `sent` and stamp the delivery time. No-op unless the
    /// alert is still pending.
    pub fn mark_sent(&mut self) {
        if self.status == AlertStatus::Pending {
            self.status = AlertStatus::Sent;
            self.sent_at = Some(Utc::now());
        }
    }

    /// Transition to `failed`. No-op unless the alert is still pending.
    pub fn mark_failed(&mut self) {
        if self.status == AlertStatus::Pending {
            self.status = AlertStatus::Failed;
        }
    }
}

/// Everything needed to raise one alert for a status transition.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub device_id: String,
    pub device_name: String,
    pub kind: AlertKind,
    pub channel: AlertChannel,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
}

/// Builds, persists and delivers alerts.
pub struct AlertDispatcher {
    alert_store: Arc<dyn AlertStore>,
    notifier: Notifier,
}

impl AlertDispatcher {
    pub fn new(alert_store: Arc<dyn AlertStore>, notifier: Notifier) -> Self {
        Self {
            alert_store,
            notifier,
        }
    }

    /// Two-phase dispatch: insert the pending record, attempt delivery on
    /// the requested channels, then update the record with the outcome.
    ///
    /// Never fails - persistence errors are logged and the (updated)
    /// in-memory alert is returned regardless.
    #[instrument(skip(self, request), fields(device = %request.device_name, kind = %request.kind))]
    pub async fn dispatch(&self, request: DispatchRequest) -> Alert {
        let mut alert = Alert::create(
            request.device_id.clone(),
            request.device_name.clone(),
            request.kind,
            request.channel,
            request.recipient_email.clone(),
            request.recipient_phone.clone(),
        );

        // Persist before attempting delivery so the event is never lost
        if let Err(e) = self.alert_store.save(alert.clone()).await {
            error!("failed to persist pending alert: {e}");
        }

        if self.attempt_delivery(&request, &alert.message).await {
            alert.mark_sent();
        } else {
            alert.mark_failed();
        }

        if let Err(e) = self.alert_store.update(alert.clone()).await {
            error!("failed to persist alert outcome: {e}");
        }

        alert
    }

    /// Try each requested channel that has a recipient configured.
    ///
    /// Returns true if at least one attempted channel succeeded; a `both`
    /// request with a single configured recipient counts that one attempt,
    /// and zero configured recipients means zero attempts (false).
    async fn attempt_delivery(&self, request: &DispatchRequest, message: &str) -> bool {
        let mut email_sent = false;
        let mut sms_sent = false;

        if matches!(request.channel, AlertChannel::Email | AlertChannel::Both) {
            if let Some(to) = &request.recipient_email {
                let subject = format!("vigil alert: {}", request.device_name);
                email_sent = self.notifier.send_email(to, &subject, message).await;
            }
        }

        if matches!(request.channel, AlertChannel::Sms | AlertChannel::Both) {
            if let Some(to) = &request.recipient_phone {
                sms_sent = self.notifier.send_sms(to, message).await;
            }
        }

        email_sent || sms_sent
    }
}
