//! Store trait definitions
//!
//! These are the contracts the monitoring engine consumes. The surrounding
//! system owns the actual persistence; the in-memory implementations in
//! [`super::memory`] satisfy the same contracts for the bin and for tests.
//!
//! ## Thread Safety
//!
//! Implementations must be `Send + Sync` as they are shared across the
//! per-device actor tasks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StoreResult;
use super::schema::{LogStats, MonitoringLog};
use crate::Device;
use crate::alerts::Alert;

/// Lookup and mutation of device configuration.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// All devices with `active = true`, fetched once at scheduler startup.
    async fn find_all_active(&self) -> StoreResult<Vec<Device>>;

    async fn find_by_id(&self, device_id: &str) -> StoreResult<Option<Device>>;

    /// Persist the device's post-check state (status, last check, latency).
    async fn update(&self, device: &Device) -> StoreResult<()>;
}

/// Append-only persistence of check results.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn save(&self, log: MonitoringLog) -> StoreResult<MonitoringLog>;

    /// Logs for a device, newest first, optionally limited.
    async fn find_by_device(
        &self,
        device_id: &str,
        limit: Option<usize>,
    ) -> StoreResult<Vec<MonitoringLog>>;

    /// Running uptime / latency aggregates over a device's history.
    async fn stats_for_device(&self, device_id: &str) -> StoreResult<LogStats>;

    /// Delete logs strictly older than `cutoff`, returning the count removed.
    ///
    /// An entry exactly at the cutoff is retained.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;
}

/// Persistence of alert records and their delivery status.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn save(&self, alert: Alert) -> StoreResult<Alert>;

    async fn update(&self, alert: Alert) -> StoreResult<Alert>;

    /// Alerts raised for a device, newest first.
    async fn find_by_device(&self, device_id: &str) -> StoreResult<Vec<Alert>>;
}
