use std::{collections::HashMap, fs};

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    /// Path prefix the catalog routes are mounted under, e.g. `/api`.
    pub api_prefix: String,
    pub fail_products: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            api_prefix: String::new(),
            fail_products: false,
        }
    }
}

pub fn load_settings() -> Settings {
    let file_cfg = fs::read_to_string("server.toml")
        .ok()
        .and_then(|raw| toml::from_str::<HashMap<String, String>>(&raw).ok());
    load_settings_with(file_cfg.as_ref(), |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    file_cfg: Option<&HashMap<String, String>>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(file_cfg) = file_cfg {
        if let Some(v) = file_cfg.get("bind_addr") {
            settings.server_bind = v.clone();
        }
        if let Some(v) = file_cfg.get("api_prefix") {
            settings.api_prefix = v.clone();
        }
        if let Some(v) = file_cfg.get("fail_products") {
            settings.fail_products = parse_flag(v).unwrap_or(settings.fail_products);
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__API_PREFIX") {
        settings.api_prefix = v;
    }

    if let Some(v) = env("APP__FAIL_PRODUCTS") {
        settings.fail_products = parse_flag(&v).unwrap_or(settings.fail_products);
    }

    settings.api_prefix = normalize_prefix(&settings.api_prefix);
    settings
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `api`, `/api/` and `/api` all mount at `/api`; empty or `/` mounts at the
/// root.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
