//! Protocol-polymorphic health checks
//!
//! The probe executes exactly one reachability check against one device,
//! bounded by the device's configured timeout. It is total: every failure
//! mode resolves to a [`CheckOutcome`] value, nothing propagates to the
//! caller.
//!
//! ## Protocol policies
//!
//! - **ping**: platform `ping` binary, success → online, anything else →
//!   offline with a generic message
//! - **http/https**: single GET, `2xx-3xx` → online, `4xx` → warning,
//!   `5xx`/connect error/timeout → offline
//! - **tcp**: raw connect to host:port (default 80)
//! - **dns**: name resolution, any address → online
//!
//! Latency is wall-clock elapsed for the whole operation, except on
//! http/tcp timeouts where the configured timeout is recorded instead.

use std::time::{Duration, Instant};

use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::{instrument, trace};

use crate::{CheckProtocol, Device, DeviceStatus};

/// Result of a single health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub status: DeviceStatus,
    pub latency_ms: Option<u64>,
    pub error_message: Option<String>,
}

impl CheckOutcome {
    fn online(latency_ms: u64) -> Self {
        Self {
            status: DeviceStatus::Online,
            latency_ms: Some(latency_ms),
            error_message: None,
        }
    }

    fn warning(latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            status: DeviceStatus::Warning,
            latency_ms: Some(latency_ms),
            error_message: Some(message.into()),
        }
    }

    fn offline(latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            status: DeviceStatus::Offline,
            latency_ms: Some(latency_ms),
            error_message: Some(message.into()),
        }
    }
}

/// Executes reachability checks against devices.
///
/// Holds one HTTP client reused across all checks.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthProbe {
    pub fn new() -> Self {
        // Redirect statuses are classified as-is, never followed; following
        // them would report the final hop instead of the probed endpoint.
        Self {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Run one check against the device, bounded by its configured timeout.
    ///
    /// Never fails - all error paths resolve to an offline or warning
    /// outcome.
    #[instrument(skip(self, device), fields(device = %device.name, protocol = %device.protocol))]
    pub async fn check(&self, device: &Device) -> CheckOutcome {
        let start = Instant::now();

        let outcome = match device.protocol {
            CheckProtocol::Ping => self.ping_check(device, start).await,
            CheckProtocol::Http | CheckProtocol::Https => self.http_check(device, start).await,
            CheckProtocol::Tcp => self.tcp_check(device, start).await,
            CheckProtocol::Dns => self.dns_check(device, start).await,
            CheckProtocol::Unknown => {
                CheckOutcome::offline(elapsed_ms(start), "unsupported check protocol")
            }
        };

        trace!(
            "check finished: {} ({:?}ms)",
            outcome.status, outcome.latency_ms
        );

        outcome
    }

    async fn ping_check(&self, device: &Device, start: Instant) -> CheckOutcome {
        let bound = Duration::from_millis(device.timeout_ms);

        match timeout(bound, ping_command(&device.host, device.timeout_ms).output()).await {
            Ok(Ok(output)) if output.status.success() => CheckOutcome::online(elapsed_ms(start)),
            _ => CheckOutcome::offline(elapsed_ms(start), "ping failed - host unreachable"),
        }
    }

    async fn http_check(&self, device: &Device, start: Instant) -> CheckOutcome {
        let https = device.protocol == CheckProtocol::Https;
        let scheme = if https { "https" } else { "http" };
        let port = device.port.unwrap_or(if https { 443 } else { 80 });
        let url = format!("{scheme}://{}:{port}", device.host);

        let request = self
            .client
            .get(&url)
            .timeout(Duration::from_millis(device.timeout_ms));

        match request.send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                let latency = elapsed_ms(start);

                match code {
                    200..=399 => CheckOutcome::online(latency),
                    400..=499 => CheckOutcome::warning(latency, format!("HTTP {code}")),
                    _ => CheckOutcome::offline(latency, format!("HTTP {code}")),
                }
            }
            Err(e) if e.is_timeout() => CheckOutcome::offline(device.timeout_ms, "request timeout"),
            Err(e) => CheckOutcome::offline(elapsed_ms(start), e.to_string()),
        }
    }

    async fn tcp_check(&self, device: &Device, start: Instant) -> CheckOutcome {
        let port = device.port.unwrap_or(80);
        let bound = Duration::from_millis(device.timeout_ms);

        match timeout(bound, TcpStream::connect((device.host.as_str(), port))).await {
            Ok(Ok(_stream)) => CheckOutcome::online(elapsed_ms(start)),
            Ok(Err(e)) => CheckOutcome::offline(elapsed_ms(start), e.to_string()),
            Err(_) => CheckOutcome::offline(device.timeout_ms, "connection timeout"),
        }
    }

    async fn dns_check(&self, device: &Device, start: Instant) -> CheckOutcome {
        let bound = Duration::from_millis(device.timeout_ms);

        match timeout(bound, lookup_host(format!("{}:80", device.host))).await {
            Ok(Ok(mut addrs)) => {
                if addrs.next().is_some() {
                    CheckOutcome::online(elapsed_ms(start))
                } else {
                    CheckOutcome::offline(elapsed_ms(start), "DNS lookup failed: no addresses")
                }
            }
            Ok(Err(e)) => {
                CheckOutcome::offline(elapsed_ms(start), format!("DNS lookup failed: {e}"))
            }
            Err(_) => CheckOutcome::offline(device.timeout_ms, "DNS lookup failed: timed out"),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(target_os = "windows")]
fn ping_command(host: &str, timeout_ms: u64) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("ping");
    command.args(["-n", "1", "-w", &timeout_ms.to_string(), host]);
    command
}

#[cfg(not(target_os = "windows"))]
fn ping_command(host: &str, timeout_ms: u64) -> tokio::process::Command {
    let timeout_secs = timeout_ms.div_ceil(1000).max(1);
    let mut command = tokio::process::Command::new("ping");
    command.args(["-c", "1", "-W", &timeout_secs.to_string(), host]);
    command
}
