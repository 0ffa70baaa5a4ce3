use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, WizardError};

pub const SERVER_URL_ENV: &str = "DOCKWIZARD_SERVER_URL";

/// Session settings. Every field has a default so a partial TOML file only
/// overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub request_timeout_secs: u64,
    /// Period of the run-status poll.
    pub poll_interval_ms: u64,
    /// Pause between unlocking a step and moving to it, so the success text
    /// is visible first. Zero is allowed.
    pub unlock_delay_ms: u64,
    /// Pause before the viewer is resized after step 1 becomes visible.
    pub resize_delay_ms: u64,
    /// Pause between revealing the workspace and generating the grid.
    pub layout_settle_ms: u64,
    /// Half-width of the center sliders, and headroom above each size.
    pub slider_buffer: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_url: "http://127.0.0.1:5000/".to_string(),
            request_timeout_secs: 600,
            poll_interval_ms: 3000,
            unlock_delay_ms: 500,
            resize_delay_ms: 100,
            layout_settle_ms: 100,
            slider_buffer: 100.0,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| WizardError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| WizardError::Config(e.to_string()))?;
        if !config.slider_buffer.is_finite() || config.slider_buffer < 0.0 {
            return Err(WizardError::Config(format!(
                "slider_buffer must be a non-negative number, got {}",
                config.slider_buffer
            )));
        }
        Ok(config)
    }

    /// Apply `DOCKWIZARD_SERVER_URL` if it is set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                log::debug!("server url from {SERVER_URL_ENV}: {url}");
                self.server_url = url;
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        // tokio intervals reject a zero period
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn unlock_delay(&self) -> Duration {
        Duration::from_millis(self.unlock_delay_ms)
    }

    pub fn resize_delay(&self) -> Duration {
        Duration::from_millis(self.resize_delay_ms)
    }

    pub fn layout_settle(&self) -> Duration {
        Duration::from_millis(self.layout_settle_ms)
    }

    /// All UI pauses set to zero and a fast poll. Used by tests and scripted runs.
    pub fn immediate(server_url: &str) -> Self {
        Config {
            server_url: server_url.to_string(),
            poll_interval_ms: 10,
            unlock_delay_ms: 0,
            resize_delay_ms: 0,
            layout_settle_ms: 0,
            ..Config::default()
        }
    }
}
