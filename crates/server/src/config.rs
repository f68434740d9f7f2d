use std::fs;

use serde::Deserialize;
use shared::domain::{ResponseShape, DEFAULT_API_NAME, DEFAULT_SITE};
use tracing::warn;

const CONFIG_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_bind: String,
    pub api_name: String,
    pub site_name: String,
    pub temperature: f64,
    pub response_shape: ResponseShape,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            api_name: DEFAULT_API_NAME.into(),
            site_name: DEFAULT_SITE.into(),
            temperature: 33.3,
            response_shape: ResponseShape::Flat,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_addr: Option<String>,
    api_name: Option<String>,
    site_name: Option<String>,
    temperature: Option<f64>,
    response_shape: Option<ResponseShape>,
}

/// Defaults, then `server.toml` in the working directory, then environment
/// variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file_config(&mut settings, &raw);
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileConfig>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(file = CONFIG_FILE, %error, "ignoring unreadable config file");
            return;
        }
    };

    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.api_name {
        settings.api_name = v;
    }
    if let Some(v) = file_cfg.site_name {
        settings.site_name = v;
    }
    if let Some(v) = file_cfg.temperature.filter(|t| t.is_finite()) {
        settings.temperature = v;
    }
    if let Some(v) = file_cfg.response_shape {
        settings.response_shape = v;
    }
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("APP__API_NAME") {
        settings.api_name = v;
    }
    if let Some(v) = lookup("APP__SITE_NAME") {
        settings.site_name = v;
    }

    if let Some(v) = lookup("APP__TEMPERATURE") {
        match v.trim().parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => settings.temperature = parsed,
            _ => warn!(value = %v, "ignoring APP__TEMPERATURE; not a finite number"),
        }
    }

    if let Some(v) = lookup("APP__RESPONSE_SHAPE") {
        match v.parse::<ResponseShape>() {
            Ok(shape) => settings.response_shape = shape,
            Err(error) => warn!(%error, "ignoring APP__RESPONSE_SHAPE"),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
