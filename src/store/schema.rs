//! Row types persisted by the log store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DeviceStatus;

/// Immutable record of one check outcome.
///
/// Created exactly once per tick, never mutated, pruned in bulk by the
/// retention job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringLog {
    pub id: String,
    pub device_id: String,
    pub status: DeviceStatus,

    /// Present only for checks that completed a network round trip
    pub latency_ms: Option<u64>,

    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl MonitoringLog {
    pub fn create(
        device_id: impl Into<String>,
        status: DeviceStatus,
        latency_ms: Option<u64>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            device_id: device_id.into(),
            status,
            latency_ms,
            error_message,
            checked_at: Utc::now(),
        }
    }
}

/// Aggregate statistics over a device's check history.
///
/// Uptime % = online checks / total checks x 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStats {
    pub total_checks: usize,
    pub online_count: usize,
    pub offline_count: usize,
    pub avg_latency_ms: f64,
    pub uptime_percent: f64,
}
