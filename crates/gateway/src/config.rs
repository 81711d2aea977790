use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "/etc/gateway/config.json";

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
const DEFAULT_CONFIGSTORE_URL: &str = "http://127.0.0.1:4002/api/v1alpha";
const DEFAULT_RUNSERVICE_URL: &str = "http://127.0.0.1:4000/api/v1alpha";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_WEBHOOK_BODY_LIMIT_BYTES: usize = 4 * 1024 * 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind_address: Option<String>,
    pub configstore_url: Option<String>,
    pub runservice_url: Option<String>,
    pub api_exposed_url: Option<String>,
    pub log_filter: Option<String>,
    pub log_format: LogFormat,
    pub webhook_body_limit_bytes: Option<usize>,
}

impl GatewayConfig {
    /// Loads the config from `GATEWAY_CONFIG_PATH`, or the default location.
    ///
    /// # Errors
    ///
    /// This function will return an error if the config file is located but JSON contents cannot be parsed
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GATEWAY_CONFIG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        Self::load_from(&config_path)
    }

    /// # Errors
    ///
    /// This function will return an error if the file exists but cannot be read or parsed
    pub fn load_from(config_path: &str) -> Result<Self> {
        let path = Path::new(config_path);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {config_path}"))?;

        let config = serde_json::from_str::<Self>(&raw)
            .with_context(|| format!("Failed to parse config JSON: {config_path}"))?;

        Ok(config)
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        setting(self.bind_address.as_deref(), "GATEWAY_BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
    }

    #[must_use]
    pub fn configstore_url(&self) -> String {
        setting(self.configstore_url.as_deref(), "GATEWAY_CONFIGSTORE_URL")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_CONFIGSTORE_URL.to_string())
    }

    #[must_use]
    pub fn runservice_url(&self) -> String {
        setting(self.runservice_url.as_deref(), "GATEWAY_RUNSERVICE_URL")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_RUNSERVICE_URL.to_string())
    }

    /// Public URL the gateway is reachable at, used to advertise webhook URLs.
    #[must_use]
    pub fn api_exposed_url(&self) -> Option<String> {
        setting(self.api_exposed_url.as_deref(), "GATEWAY_API_EXPOSED_URL")
            .map(|value| value.trim_end_matches('/').to_string())
    }

    #[must_use]
    pub fn log_filter(&self) -> String {
        self.log_filter
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_LOG_FILTER)
            .to_string()
    }

    #[must_use]
    pub fn webhook_body_limit_bytes(&self) -> usize {
        self.webhook_body_limit_bytes
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_WEBHOOK_BODY_LIMIT_BYTES)
    }

    /// Webhook URL a remote source should deliver to for `project_id`.
    #[must_use]
    pub fn webhook_url(&self, project_id: &str) -> Option<String> {
        self.api_exposed_url().map(|base| {
            format!(
                "{base}/webhooks?projectid={}",
                urlencoding::encode(project_id)
            )
        })
    }
}

fn setting(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(ToString::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
