use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "admin.toml";

/// Page sizes offered by the list screens.
pub const PAGE_SIZE_CHOICES: [usize; 3] = [5, 10, 20];

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub page_size: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3000/api".into(),
            api_key: None,
            request_timeout_secs: 15,
            page_size: PAGE_SIZE_CHOICES[0],
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `key = "value"` file at `path` if it exists, then
/// environment overrides resolved through `env`.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_url") {
                settings.api_url = v.clone();
            }
            if let Some(v) = file_cfg.get("api_key") {
                settings.api_key = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("request_timeout_secs") {
                if let Ok(parsed) = v.parse::<u64>() {
                    settings.request_timeout_secs = parsed;
                }
            }
            if let Some(v) = file_cfg.get("page_size") {
                if let Ok(parsed) = v.parse::<usize>() {
                    settings.page_size = parsed;
                }
            }
        }
    }

    if let Some(v) = env("ADMIN_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("ADMIN_API_KEY") {
        settings.api_key = Some(v);
    }
    if let Some(v) = env("APP__API_KEY") {
        settings.api_key = Some(v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = env("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.page_size = parsed;
        }
    }

    if settings.page_size == 0 {
        settings.page_size = ClientSettings::default().page_size;
    }
    if settings.request_timeout_secs == 0 {
        settings.request_timeout_secs = ClientSettings::default().request_timeout_secs;
    }

    settings
}

/// Parses the API base url, forcing a trailing slash so relative routes join
/// underneath it instead of replacing its last segment.
pub fn parse_api_url(raw: &str) -> anyhow::Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("api url must not be empty");
    }
    let mut url = Url::parse(raw).with_context(|| format!("invalid api url '{raw}'"))?;
    if url.cannot_be_a_base() {
        bail!("api url '{raw}' cannot be used as a base");
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
