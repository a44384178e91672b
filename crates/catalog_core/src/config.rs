use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::{error::SettingsError, stream::DEFAULT_CHANNEL_CAPACITY};

pub const DEFAULT_SETTINGS_FILE: &str = "catalog.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Per-stream broadcast buffer before slow subscribers start lagging.
    pub channel_capacity: usize,
    pub log_payloads: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            request_timeout_secs: 30,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_payloads: false,
        }
    }
}

impl ClientSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let url = Url::parse(&self.base_url).map_err(|source| SettingsError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(SettingsError::UnsupportedScheme {
                    url: self.base_url.clone(),
                    scheme: scheme.to_string(),
                })
            }
        }
        if self.channel_capacity == 0 {
            return Err(SettingsError::InvalidValue {
                key: "channel_capacity",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file at `path` if it exists, then environment
/// overrides looked up through `env`.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings> {
    let mut settings = if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        toml::from_str::<ClientSettings>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?
    } else {
        ClientSettings::default()
    };

    apply_env_overrides(&mut settings, env)?;
    settings.validate()?;
    Ok(settings)
}

fn apply_env_overrides(
    settings: &mut ClientSettings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), SettingsError> {
    if let Some(v) = env("CATALOG_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = parse_value("APP__REQUEST_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = env("APP__CHANNEL_CAPACITY") {
        settings.channel_capacity = parse_value("APP__CHANNEL_CAPACITY", &v)?;
    }
    if let Some(v) = env("APP__LOG_PAYLOADS") {
        settings.log_payloads = parse_value("APP__LOG_PAYLOADS", &v)?;
    }

    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, SettingsError> {
    value.trim().parse().map_err(|_| SettingsError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
