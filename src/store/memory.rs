//! In-memory store implementations (no persistence)
//!
//! Backed by `tokio::sync::RwLock` maps so concurrent device ticks can
//! read and write safely. Useful for:
//! - Testing without database dependencies
//! - Running the engine standalone with config-seeded devices
//!
//! All data is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{AlertStore, DeviceStore, LogStore};
use super::error::{StoreError, StoreResult};
use super::schema::{LogStats, MonitoringLog};
use crate::alerts::Alert;
use crate::{Device, DeviceStatus};

/// In-memory device store.
#[derive(Default)]
pub struct MemoryDeviceStore {
    devices: RwLock<HashMap<String, Device>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a device. Stands in for the external CRUD create path.
    pub async fn insert(&self, device: Device) {
        self.devices.write().await.insert(device.id.clone(), device);
    }

    /// Remove a device. Stands in for the external CRUD delete path; the
    /// caller must also unschedule it.
    pub async fn remove(&self, device_id: &str) -> Option<Device> {
        self.devices.write().await.remove(device_id)
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn find_all_active(&self) -> StoreResult<Vec<Device>> {
        let devices = self.devices.read().await;
        Ok(devices.values().filter(|d| d.active).cloned().collect())
    }

    async fn find_by_id(&self, device_id: &str) -> StoreResult<Option<Device>> {
        Ok(self.devices.read().await.get(device_id).cloned())
    }

    async fn update(&self, device: &Device) -> StoreResult<()> {
        let mut devices = self.devices.write().await;
        match devices.get_mut(&device.id) {
            Some(existing) => {
                *existing = device.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("device {}", device.id))),
        }
    }
}

/// In-memory append-only log store.
#[derive(Default)]
pub struct MemoryLogStore {
    logs: RwLock<Vec<MonitoringLog>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn save(&self, log: MonitoringLog) -> StoreResult<MonitoringLog> {
        self.logs.write().await.push(log.clone());
        Ok(log)
    }

    async fn find_by_device(
        &self,
        device_id: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<MonitoringLog>> {
        let logs = self.logs.read().await;
        let mut matching: Vec<MonitoringLog> = logs
            .iter()
            .filter(|l| l.device_id == device_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        if let Some(limit) = limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn stats_for_device(&self, device_id: &str) -> StoreResult<LogStats> {
        let logs = self.logs.read().await;
        let matching: Vec<&MonitoringLog> =
            logs.iter().filter(|l| l.device_id == device_id).collect();

        let total_checks = matching.len();
        if total_checks == 0 {
            return Ok(LogStats::default());
        }

        let online_count = matching
            .iter()
            .filter(|l| l.status == DeviceStatus::Online)
            .count();
        let offline_count = matching
            .iter()
            .filter(|l| l.status == DeviceStatus::Offline)
            .count();

        let latencies: Vec<u64> = matching.iter().filter_map(|l| l.latency_ms).collect();
        let avg_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        };

        Ok(LogStats {
            total_checks,
            online_count,
            offline_count,
            avg_latency_ms,
            uptime_percent: online_count as f64 / total_checks as f64 * 100.0,
        })
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut logs = self.logs.write().await;
        let before = logs.len();
        logs.retain(|l| l.checked_at >= cutoff);
        let removed = before - logs.len();
        debug!("deleted {removed} logs older than {cutoff}");
        Ok(removed)
    }
}

/// In-memory alert store.
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored alert, in insertion order.
    pub async fn all(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn save(&self, alert: Alert) -> StoreResult<Alert> {
        self.alerts.write().await.push(alert.clone());
        Ok(alert)
    }

    async fn update(&self, alert: Alert) -> StoreResult<Alert> {
        let mut alerts = self.alerts.write().await;
        match alerts.iter_mut().find(|a| a.id == alert.id) {
            Some(existing) => {
                *existing = alert.clone();
                Ok(alert)
            }
            None => Err(StoreError::NotFound(format!("alert {}", alert.id))),
        }
    }

    async fn find_by_device(&self, device_id: &str) -> StoreResult<Vec<Alert>> {
        let alerts = self.alerts.read().await;
        let mut matching: Vec<Alert> = alerts
            .iter()
            .filter(|a| a.device_id == device_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}
