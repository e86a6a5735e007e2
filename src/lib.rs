pub mod alerts;
pub mod config;
pub mod notify;
pub mod probe;
pub mod scheduler;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health state of a monitored device.
///
/// `Unknown` is the initial state before the first check; the probe itself
/// never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Warning,
    Unknown,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceStatus::Online => write!(f, "online"),
            DeviceStatus::Offline => write!(f, "offline"),
            DeviceStatus::Warning => write!(f, "warning"),
            DeviceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// How a device is checked for reachability.
///
/// Protocol strings arrive from an external CRUD surface, so unrecognized
/// values deserialize into `Unknown` instead of rejecting the device record.
/// The probe maps `Unknown` to an immediate offline result without any I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckProtocol {
    Ping,
    Http,
    Https,
    Tcp,
    Dns,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for CheckProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckProtocol::Ping => write!(f, "ping"),
            CheckProtocol::Http => write!(f, "http"),
            CheckProtocol::Https => write!(f, "https"),
            CheckProtocol::Tcp => write!(f, "tcp"),
            CheckProtocol::Dns => write!(f, "dns"),
            CheckProtocol::Unknown => write!(f, "unknown"),
        }
    }
}

/// What the device is. Descriptive only - the check logic is driven entirely
/// by [`CheckProtocol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Server,
    Router,
    Switch,
    Api,
    Domain,
    Port,
    Service,
}

/// A monitored network endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub host: String,
    pub port: Option<u16>,
    pub protocol: CheckProtocol,

    /// Check interval in seconds (> 0).
    pub interval_secs: u64,

    /// Per-check timeout in milliseconds (> 0).
    pub timeout_ms: u64,

    pub status: DeviceStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub last_latency_ms: Option<u64>,

    /// Inactive devices are never scheduled.
    pub active: bool,

    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// Create a new device in its initial `Unknown` state.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        name: impl Into<String>,
        kind: DeviceKind,
        host: impl Into<String>,
        port: Option<u16>,
        protocol: CheckProtocol,
        interval_secs: u64,
        timeout_ms: u64,
        user_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            host: host.into(),
            port,
            protocol,
            interval_secs,
            timeout_ms,
            status: DeviceStatus::Unknown,
            last_check: None,
            last_latency_ms: None,
            active: true,
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the outcome of a check on the device itself.
    pub fn apply_check(&mut self, status: DeviceStatus, latency_ms: Option<u64>) {
        self.status = status;
        self.last_check = Some(Utc::now());
        self.last_latency_ms = latency_ms;
        self.updated_at = Utc::now();
    }
}
