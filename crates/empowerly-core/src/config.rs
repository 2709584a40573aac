use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::MonitorConfig;

const MAX_INACTIVITY_TIMEOUT_SECS: u64 = 24 * 60 * 60;
const MAX_THROTTLE_MILLIS: u64 = 60 * 1000;
const MAX_NOTIFICATION_TTL_SECS: u64 = 60 * 60;
const MAX_TICK_MILLIS: u64 = 60 * 1000;

/// Get the local data directory for empowerly.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("empowerly");
    Ok(path)
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub daemon: DaemonConfig,
}

/// Inactivity and notification timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub inactivity_timeout_secs: u64,
    pub warning_lead_secs: u64,
    pub throttle_millis: u64,
    pub notification_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 15 * 60,
            warning_lead_secs: 60,
            throttle_millis: 1000,
            notification_ttl_secs: 5,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            inactivity_timeout: Duration::from_secs(self.inactivity_timeout_secs),
            warning_lead: Duration::from_secs(self.warning_lead_secs),
            throttle_window: Duration::from_millis(self.throttle_millis),
        }
    }

    #[must_use]
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs)
    }

    /// Check that the timings describe a usable monitor
    ///
    /// # Errors
    ///
    /// Returns an error if a value is zero or above its upper bound (timeout 24h,
    /// throttle 60s, notification TTL 1h), if the warning lead is not shorter
    /// than the timeout, or if the throttle window is not shorter than the timeout
    pub fn validate(&self) -> Result<()> {
        if self.inactivity_timeout_secs == 0 {
            anyhow::bail!("session.inactivity_timeout_secs must be greater than 0");
        }
        if self.inactivity_timeout_secs > MAX_INACTIVITY_TIMEOUT_SECS {
            anyhow::bail!(
                "session.inactivity_timeout_secs ({}) must be at most {MAX_INACTIVITY_TIMEOUT_SECS}",
                self.inactivity_timeout_secs
            );
        }
        if self.warning_lead_secs >= self.inactivity_timeout_secs {
            anyhow::bail!(
                "session.warning_lead_secs ({}) must be shorter than session.inactivity_timeout_secs ({})",
                self.warning_lead_secs,
                self.inactivity_timeout_secs
            );
        }
        if self.throttle_millis == 0 {
            anyhow::bail!("session.throttle_millis must be greater than 0");
        }
        if self.throttle_millis > MAX_THROTTLE_MILLIS
            || self.throttle_millis >= self.inactivity_timeout_secs * 1000
        {
            anyhow::bail!(
                "session.throttle_millis ({}) must be at most {MAX_THROTTLE_MILLIS} and shorter than the inactivity timeout",
                self.throttle_millis
            );
        }
        if self.notification_ttl_secs > MAX_NOTIFICATION_TTL_SECS {
            anyhow::bail!(
                "session.notification_ttl_secs ({}) must be at most {MAX_NOTIFICATION_TTL_SECS}",
                self.notification_ttl_secs
            );
        }
        Ok(())
    }
}

/// Host process settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub tick_millis: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { tick_millis: 250 }
    }
}

impl DaemonConfig {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }

    /// # Errors
    ///
    /// Returns an error if the tick interval exceeds one minute
    pub fn validate(&self) -> Result<()> {
        if self.tick_millis > MAX_TICK_MILLIS {
            anyhow::bail!(
                "daemon.tick_millis ({}) must be at most {MAX_TICK_MILLIS}",
                self.tick_millis
            );
        }
        Ok(())
    }
}

impl AppConfig {
    /// Default location: `<data dir>/config.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined
    pub fn default_path() -> Result<PathBuf> {
        Ok(get_data_dir()?.join("config.toml"))
    }

    /// Load configuration from `path`; a missing file yields the defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or fails validation
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        config
            .session
            .validate()
            .and_then(|()| config.daemon.validate())
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        Ok(config)
    }

    /// Load from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory is unknown or the file is invalid
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path()?)
    }

    /// Render as TOML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
