use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub stream: StreamSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the interview/avatar backend
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

/// Per-session tunables
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Seconds of no user interaction before the avatar session is torn down
    pub idle_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300, // 5 minutes
        }
    }
}

impl SessionSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Avatar stream connection policy
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    /// Max connection attempts before giving up
    pub retry_limit: u32,

    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,

    /// Hard ceiling on total connection time in milliseconds
    pub deadline_ms: u64,

    /// Interval between playback-position samples in milliseconds
    pub probe_interval_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            retry_limit: 16,
            retry_delay_ms: 500,
            deadline_ms: 8_000,
            probe_interval_ms: 500,
        }
    }
}

impl StreamSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

fn default_remote_timeout_secs() -> u64 {
    15
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
