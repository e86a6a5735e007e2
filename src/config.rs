use anyhow::Context;
use tracing::trace;

use crate::{CheckProtocol, Device, DeviceKind};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Devices seeded into the device store at startup.
    pub devices: Option<Vec<DeviceConfig>>,

    /// Alert recipients (falls back to ALERT_EMAIL / ALERT_PHONE env vars)
    pub recipients: Option<RecipientsConfig>,

    /// Log retention settings (optional - defaults to 30 days, daily cleanup)
    pub retention: Option<RetentionConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(default = "default_device_kind")]
    pub kind: DeviceKind,
    pub host: String,
    pub port: Option<u16>,
    pub protocol: CheckProtocol,

    /// Check interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Check timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_active")]
    pub active: bool,
}

impl DeviceConfig {
    pub fn into_device(self, user_id: &str) -> Device {
        let mut device = Device::create(
            self.name,
            self.kind,
            self.host,
            self.port,
            self.protocol,
            self.interval,
            self.timeout,
            user_id,
        );
        device.active = self.active;
        device
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RecipientsConfig {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RetentionConfig {
    /// Logs older than this are deleted by the cleanup job
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// How often the cleanup job runs
    #[serde(default = "default_cleanup_interval_hours")]
    pub cleanup_interval_hours: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        RetentionConfig {
            retention_days: default_retention_days(),
            cleanup_interval_hours: default_cleanup_interval_hours(),
        }
    }
}

fn default_device_kind() -> DeviceKind {
    DeviceKind::Server
}

fn default_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    5000
}

fn default_active() -> bool {
    true
}

fn default_retention_days() -> u32 {
    30
}

fn default_cleanup_interval_hours() -> u32 {
    24
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path}"))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid config file {path}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
