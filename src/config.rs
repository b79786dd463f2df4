use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::store::MAX_TTL_HOURS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL, every API path is appended to it
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of stored credentials in hours
    pub ttl_hours: u64,
    /// Regular polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Polling interval used right after a connect request
    pub fast_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding the expiring credential cache
    pub store_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Redraw tick in milliseconds
    pub tick_rate_ms: u64,
    /// Directory for the dashboard log file
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                base_url: "http://localhost:8080".to_string(),
                request_timeout_secs: 30,
            },
            session: SessionConfig {
                ttl_hours: 6,
                poll_interval_ms: 5000,
                fast_poll_interval_ms: 1000,
            },
            storage: StorageConfig {
                store_path: ".gateway-console/store.db".to_string(),
            },
            dashboard: DashboardConfig {
                tick_rate_ms: 250,
                log_dir: ".gateway-console/logs".to_string(),
            },
        }
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let default_config = Self::default();
            default_config.save(path).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path).await?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.gateway.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("Gateway base URL must start with http:// or https://, got {:?}", url);
        }

        if self.gateway.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be at least 1 second");
        }

        if self.session.ttl_hours == 0 {
            anyhow::bail!("Credential TTL must be at least 1 hour");
        }

        if self.session.ttl_hours > MAX_TTL_HOURS {
            anyhow::bail!("Credential TTL must not exceed {} hours", MAX_TTL_HOURS);
        }

        if self.session.fast_poll_interval_ms == 0 || self.session.poll_interval_ms == 0 {
            anyhow::bail!("Poll intervals must be positive");
        }

        if self.session.fast_poll_interval_ms > self.session.poll_interval_ms {
            anyhow::bail!(
                "Fast poll interval ({}ms) must not exceed the normal interval ({}ms)",
                self.session.fast_poll_interval_ms,
                self.session.poll_interval_ms
            );
        }

        Ok(())
    }
}
