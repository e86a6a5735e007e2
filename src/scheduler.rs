//! Per-device monitoring scheduler
//!
//! Each active device gets its own monitor actor that ticks at the device's
//! configured interval. Because the actor loop awaits the check before
//! selecting again, ticks for one device can never overlap; slow checks
//! delay the next tick instead of stacking.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → probe → persist device + log → transition? → dispatch alert
//!     ↑
//!     └─── Commands (CheckNow, Shutdown)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::alerts::{AlertChannel, AlertDispatcher, AlertKind, DispatchRequest};
use crate::config::{RecipientsConfig, RetentionConfig};
use crate::probe::HealthProbe;
use crate::store::{DeviceStore, LogStore, MonitoringLog};
use crate::{Device, DeviceStatus};

/// Where transition alerts go.
///
/// One shared recipient pair for the whole engine; which channels an alert
/// uses follows from which recipients are present.
#[derive(Debug, Clone, Default)]
pub struct Recipients {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Recipients {
    /// Read recipients from `ALERT_EMAIL` / `ALERT_PHONE`.
    pub fn from_env() -> Self {
        Self {
            email: std::env::var("ALERT_EMAIL").ok(),
            phone: std::env::var("ALERT_PHONE").ok(),
        }
    }

    /// The alert channel implied by the configured recipients, or `None`
    /// when there is nobody to notify.
    pub fn channel(&self) -> Option<AlertChannel> {
        match (&self.email, &self.phone) {
            (Some(_), Some(_)) => Some(AlertChannel::Both),
            (Some(_), None) => Some(AlertChannel::Email),
            (None, Some(_)) => Some(AlertChannel::Sms),
            (None, None) => None,
        }
    }
}

impl From<RecipientsConfig> for Recipients {
    fn from(config: RecipientsConfig) -> Self {
        Self {
            email: config.email,
            phone: config.phone,
        }
    }
}

/// Remembers the last status an alert decision was made against.
///
/// Kept separate from [`Device::status`] so that alerting state survives
/// device-record rewrites from the outside.
#[async_trait]
pub trait TransitionTracker: Send + Sync {
    /// Status recorded for the device by the previous check, if any.
    async fn previous(&self, device_id: &str) -> Option<DeviceStatus>;

    async fn record(&self, device_id: &str, status: DeviceStatus);
}

/// In-memory transition tracker. Empty at startup, so the first check of
/// every device never raises an alert.
#[derive(Default)]
pub struct MemoryTransitionTracker {
    seen: RwLock<HashMap<String, DeviceStatus>>,
}

impl MemoryTransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransitionTracker for MemoryTransitionTracker {
    async fn previous(&self, device_id: &str) -> Option<DeviceStatus> {
        self.seen.read().await.get(device_id).copied()
    }

    async fn record(&self, device_id: &str, status: DeviceStatus) {
        self.seen.write().await.insert(device_id.to_string(), status);
    }
}

/// Decide whether a status change warrants an alert, and which kind.
///
/// `previous = None` means this is the first observed check; nothing is
/// raised regardless of the outcome. A repeat of the previous status is
/// silent. Recovery is only announced when coming back from offline.
pub fn derive_alert_kind(
    previous: Option<DeviceStatus>,
    current: DeviceStatus,
) -> Option<AlertKind> {
    let previous = previous?;
    if previous == current {
        return None;
    }

    match current {
        DeviceStatus::Offline => Some(AlertKind::Down),
        DeviceStatus::Online if previous == DeviceStatus::Offline => Some(AlertKind::Up),
        DeviceStatus::Warning => Some(AlertKind::Warning),
        _ => None,
    }
}

/// Shared collaborators handed to every device monitor actor.
#[derive(Clone)]
pub struct MonitorContext {
    pub device_store: Arc<dyn DeviceStore>,
    pub log_store: Arc<dyn LogStore>,
    pub tracker: Arc<dyn TransitionTracker>,
    pub dispatcher: Arc<AlertDispatcher>,
    pub recipients: Recipients,
}

/// Control messages for a device monitor actor.
pub enum DeviceCommand {
    /// Run a check immediately, outside the regular cadence
    CheckNow {
        respond_to: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

/// Actor that monitors a single device.
///
/// Runs until it receives a Shutdown command or its command channel closes.
pub struct DeviceMonitorActor {
    device: Device,
    probe: HealthProbe,
    ctx: MonitorContext,
    command_rx: mpsc::Receiver<DeviceCommand>,
    interval_duration: Duration,
}

impl DeviceMonitorActor {
    #[instrument(skip(self), fields(device = %self.device.name))]
    pub async fn run(mut self) {
        debug!("starting device monitor actor");

        let mut ticker = interval(self.interval_duration);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.perform_check().await {
                        error!("health check failed: {:#}", e);
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        DeviceCommand::CheckNow { respond_to } => {
                            debug!("received CheckNow command");
                            let result = self.perform_check().await;
                            let _ = respond_to.send(result);
                        }

                        DeviceCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("device monitor actor stopped");
    }

    /// One full check pipeline:
    ///
    /// 1. Refetch the device so outside edits (deactivation, deletion,
    ///    host changes) take effect on the next tick
    /// 2. Probe it
    /// 3. Persist the new device state and append a monitoring log
    /// 4. Compare against the tracked previous status and raise an alert
    ///    on a transition
    ///
    /// The probe itself never fails; errors here are store errors.
    #[instrument(skip(self), fields(device = %self.device.name, protocol = %self.device.protocol))]
    async fn perform_check(&self) -> Result<()> {
        let current = self
            .ctx
            .device_store
            .find_by_id(&self.device.id)
            .await
            .context("failed to refetch device")?;

        let Some(mut device) = current else {
            debug!("device no longer exists, skipping check");
            return Ok(());
        };
        if !device.active {
            debug!("device deactivated, skipping check");
            return Ok(());
        }

        let outcome = self.probe.check(&device).await;
        trace!("check outcome: {} ({:?}ms)", outcome.status, outcome.latency_ms);

        device.apply_check(outcome.status, outcome.latency_ms);
        self.ctx
            .device_store
            .update(&device)
            .await
            .context("failed to persist device state")?;

        let log = MonitoringLog::create(
            &device.id,
            outcome.status,
            outcome.latency_ms,
            outcome.error_message,
        );
        self.ctx
            .log_store
            .save(log)
            .await
            .context("failed to persist monitoring log")?;

        let previous = self.ctx.tracker.previous(&device.id).await;
        if let Some(kind) = derive_alert_kind(previous, outcome.status) {
            self.dispatch_transition_alert(&device, kind).await;
        }

        // Recorded even when no alert fired, so the next comparison is
        // always against the latest observation.
        self.ctx.tracker.record(&device.id, outcome.status).await;

        Ok(())
    }

    async fn dispatch_transition_alert(&self, device: &Device, kind: AlertKind) {
        let Some(channel) = self.ctx.recipients.channel() else {
            warn!(
                "status transition on {} but no alert recipients configured",
                device.name
            );
            return;
        };

        let alert = self
            .ctx
            .dispatcher
            .dispatch(DispatchRequest {
                device_id: device.id.clone(),
                device_name: device.name.clone(),
                kind,
                channel,
                recipient_email: self.ctx.recipients.email.clone(),
                recipient_phone: self.ctx.recipients.phone.clone(),
            })
            .await;

        info!(
            "raised {} alert for {} (delivery: {})",
            alert.kind, device.name, alert.status
        );
    }
}

/// Handle for controlling a device monitor actor
#[derive(Clone)]
pub struct DeviceHandle {
    sender: mpsc::Sender<DeviceCommand>,
    device_id: String,
    device_name: String,
}

impl DeviceHandle {
    /// Spawn a monitor actor for the device and return its handle.
    pub fn spawn(device: Device, probe: HealthProbe, ctx: MonitorContext) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let device_id = device.id.clone();
        let device_name = device.name.clone();
        // Guard against a zero interval slipping through external config
        let interval_duration = Duration::from_secs(device.interval_secs.max(1));

        let actor = DeviceMonitorActor {
            device,
            probe,
            ctx,
            command_rx: cmd_rx,
            interval_duration,
        };

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            device_id,
            device_name,
        }
    }

    /// Trigger an immediate check and wait for it to complete.
    pub async fn check_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DeviceCommand::CheckNow { respond_to: tx })
            .await
            .context("monitor actor is gone")?;

        rx.await??;
        Ok(())
    }

    /// Shut down the monitor actor.
    pub async fn shutdown(self) {
        let _ = self.sender.send(DeviceCommand::Shutdown).await;
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Owns the monitor actors and the background retention job.
pub struct MonitoringScheduler {
    ctx: MonitorContext,
    probe: HealthProbe,
    handles: HashMap<String, DeviceHandle>,
    retention: RetentionConfig,
    cleanup_task: Option<JoinHandle<()>>,
}

impl MonitoringScheduler {
    pub fn new(ctx: MonitorContext, retention: RetentionConfig) -> Self {
        Self {
            ctx,
            probe: HealthProbe::new(),
            handles: HashMap::new(),
            retention,
            cleanup_task: None,
        }
    }

    /// Schedule every active device and start the retention job.
    ///
    /// Returns the number of devices scheduled.
    pub async fn start(&mut self) -> Result<usize> {
        let devices = self
            .ctx
            .device_store
            .find_all_active()
            .await
            .context("failed to load active devices")?;

        for device in devices {
            self.schedule_device(device).await;
        }

        self.cleanup_task = Some(spawn_cleanup_task(
            Arc::clone(&self.ctx.log_store),
            self.retention.clone(),
        ));

        info!("scheduler started with {} device(s)", self.handles.len());
        Ok(self.handles.len())
    }

    /// Start (or restart) monitoring a device. Inactive devices are ignored.
    pub async fn schedule_device(&mut self, device: Device) {
        if !device.active {
            debug!("not scheduling inactive device {}", device.name);
            return;
        }

        // Replace any existing actor so interval changes take effect
        if let Some(existing) = self.handles.remove(&device.id) {
            existing.shutdown().await;
        }

        debug!(
            "scheduling {} every {}s ({})",
            device.name, device.interval_secs, device.protocol
        );
        let handle = DeviceHandle::spawn(device, self.probe.clone(), self.ctx.clone());
        self.handles.insert(handle.device_id().to_string(), handle);
    }

    /// Stop monitoring a device. Returns false if it was not scheduled.
    pub async fn unschedule_device(&mut self, device_id: &str) -> bool {
        match self.handles.remove(device_id) {
            Some(handle) => {
                debug!("unscheduling {}", handle.device_name());
                handle.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Shut down all monitor actors and the retention job.
    pub async fn stop(mut self) {
        if let Some(task) = self.cleanup_task.take() {
            task.abort();
        }
        for (_, handle) in self.handles.drain() {
            handle.shutdown().await;
        }
        info!("scheduler stopped");
    }

    pub fn scheduled_count(&self) -> usize {
        self.handles.len()
    }

    pub fn handle(&self, device_id: &str) -> Option<&DeviceHandle> {
        self.handles.get(device_id)
    }
}

/// Periodically delete monitoring logs older than the retention window.
fn spawn_cleanup_task(log_store: Arc<dyn LogStore>, retention: RetentionConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(u64::from(retention.cleanup_interval_hours) * 3600);
        let mut ticker = interval(period);

        loop {
            ticker.tick().await;

            let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention.retention_days));
            match log_store.delete_older_than(cutoff).await {
                Ok(removed) if removed > 0 => {
                    info!("retention cleanup removed {removed} log(s) older than {cutoff}");
                }
                Ok(_) => trace!("retention cleanup found nothing to remove"),
                Err(e) => error!("retention cleanup failed: {e}"),
            }
        }
    })
}
