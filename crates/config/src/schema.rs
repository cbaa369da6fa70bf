/// Config schema types (slack, smtp, digest, supervisor).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackntellConfig {
    pub slack: SlackConfig,
    pub smtp: SmtpConfig,
    pub digest: DigestConfig,
    pub supervisor: SupervisorConfig,
}

/// Slack workspace connection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot or user token (`xoxb-…` / `xoxp-…`) used for Web API calls.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// App-level token (`xapp-…`) used to open the Socket Mode stream.
    #[serde(serialize_with = "serialize_secret")]
    pub app_token: Secret<String>,

    /// Messages sent by this user id never trigger a notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_user_id: Option<String>,

    /// Web API base URL.
    pub api_base: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .field("self_user_id", &self.self_user_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            app_token: Secret::new(String::new()),
            self_user_id: None,
            api_base: "https://slack.com/api".into(),
        }
    }
}

/// Outbound mail relay. Connects with implicit TLS.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
    pub from: String,
    pub to: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 465,
            username: String::new(),
            password: Secret::new(String::new()),
            from: String::new(),
            to: String::new(),
        }
    }
}

/// Rate window and lookback settings for digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Minimum spacing between notifications for one conversation.
    pub rate_window_secs: u64,
    /// Trailing history included in a digest.
    pub lookback_secs: u64,
    /// Maximum number of history messages requested per digest.
    pub history_limit: u32,
    /// IANA timezone used to render line timestamps.
    pub timezone: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            rate_window_secs: 10 * 60,
            lookback_secs: 24 * 60 * 60,
            history_limit: 200,
            timezone: "UTC".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Liveness poll interval.
    pub health_interval_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            health_interval_secs: 30,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
