//! Notification transports for alert delivery
//!
//! Each transport is optional and wired only when its credentials are
//! present in the environment. An absent transport reports failure without
//! attempting I/O; callers see only the boolean result, the difference is
//! visible in the logs.

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, warn};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Maximum SMS body length; longer messages are truncated.
const SMS_MAX_LEN: usize = 160;

/// Email delivery capability. Total: logs and returns `false` on failure.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool;
}

/// SMS delivery capability. Total: logs and returns `false` on failure.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> bool;
}

/// Fans alert messages out to whichever transports are configured.
pub struct Notifier {
    email: Option<Box<dyn EmailTransport>>,
    sms: Option<Box<dyn SmsTransport>>,
}

impl Notifier {
    pub fn new(email: Option<Box<dyn EmailTransport>>, sms: Option<Box<dyn SmsTransport>>) -> Self {
        Self { email, sms }
    }

    /// Wire transports from environment credentials.
    ///
    /// Missing credentials leave the corresponding channel absent rather
    /// than failing construction.
    pub fn from_env(client: &reqwest::Client) -> Self {
        let email = match ResendEmailTransport::from_env(client) {
            Some(transport) => Some(Box::new(transport) as Box<dyn EmailTransport>),
            None => {
                warn!("email transport not configured (RESEND_API_KEY missing)");
                None
            }
        };

        let sms = match HttpSmsTransport::from_env(client) {
            Some(transport) => Some(Box::new(transport) as Box<dyn SmsTransport>),
            None => {
                warn!("SMS transport not configured (SMS_API_URL / SMS_API_KEY missing)");
                None
            }
        };

        Self { email, sms }
    }

    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> bool {
        match &self.email {
            Some(transport) => transport.send(to, subject, body).await,
            None => {
                warn!("no email transport available, dropping email to {to}");
                false
            }
        }
    }

    pub async fn send_sms(&self, to: &str, body: &str) -> bool {
        match &self.sms {
            Some(transport) => transport.send(to, body).await,
            None => {
                warn!("no SMS transport available, dropping SMS to {to}");
                false
            }
        }
    }
}

/// Email transport backed by the Resend HTTP API.
pub struct ResendEmailTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ResendEmailTransport {
    pub fn from_env(client: &reqwest::Client) -> Option<Self> {
        let api_key = std::env::var("RESEND_API_KEY").ok()?;
        let from =
            std::env::var("RESEND_FROM_EMAIL").unwrap_or_else(|_| "alerts@vigil.dev".to_string());
        Some(Self::new(client.clone(), RESEND_API_URL, api_key, from))
    }

    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl EmailTransport for ResendEmailTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        let payload = json!({
            "from": format!("vigil alerts <{}>", self.from),
            "to": [to],
            "subject": subject,
            "html": format!("<h2>{subject}</h2><p>{body}</p>"),
        });

        match self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("email sent to {to}");
                true
            }
            Ok(response) => {
                error!("email delivery failed with status: {}", response.status());
                false
            }
            Err(e) => {
                error!("failed to send email: {e}");
                false
            }
        }
    }
}

/// SMS transport backed by a bearer-token JSON gateway.
pub struct HttpSmsTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpSmsTransport {
    pub fn from_env(client: &reqwest::Client) -> Option<Self> {
        let api_url = std::env::var("SMS_API_URL").ok()?;
        let api_key = std::env::var("SMS_API_KEY").ok()?;
        let from = std::env::var("SMS_FROM_NAME").unwrap_or_else(|_| "vigil".to_string());
        Some(Self::new(client.clone(), api_url, api_key, from))
    }

    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl SmsTransport for HttpSmsTransport {
    async fn send(&self, to: &str, body: &str) -> bool {
        let payload = json!({
            "message": truncate_sms(body),
            "from": self.from,
            "to": to,
        });

        match self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("SMS sent to {to}");
                true
            }
            Ok(response) => {
                error!("SMS delivery failed with status: {}", response.status());
                false
            }
            Err(e) => {
                error!("failed to send SMS: {e}");
                false
            }
        }
    }
}

/// Truncate a message to the SMS length limit, char-aware since alert
/// messages contain emoji.
fn truncate_sms(body: &str) -> String {
    if body.chars().count() <= SMS_MAX_LEN {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(SMS_MAX_LEN - 3).collect();
    truncated.push_str("...");
    truncated
}
