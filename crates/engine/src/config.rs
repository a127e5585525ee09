use std::{env, path::PathBuf};

use bindery_types::RequestOptions;
use bindery_util::expand_tilde;
use dirs_next::config_dir;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CONFIG_PATH_ENV: &str = "BINDERY_CONFIG_PATH";
pub const BASE_URL_ENV: &str = "BINDERY_BASE_URL";

/// How much of each exchange the dispatch table logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    None,
    /// Method, URL, status and elapsed time.
    Basic,
    /// Basic plus redacted headers.
    Headers,
    /// Headers plus a body preview.
    Full,
}

/// Client defaults shared by every method of a dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub log_level: LogLevel,
    pub options: RequestOptions,
    /// Decode 404 responses as `null` instead of reporting an error.
    pub decode_404: bool,
    /// Sent with every request unless the method sets the header itself.
    pub default_headers: IndexMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            log_level: LogLevel::None,
            options: RequestOptions::default(),
            decode_404: false,
            default_headers: IndexMap::new(),
        }
    }
}

impl ClientConfig {
    /// Reads the config file, falling back to defaults when it is missing or
    /// unreadable. `BINDERY_BASE_URL` overrides the base URL either way.
    pub fn load() -> Self {
        let path = default_config_path();
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                warn!(path = %path.display(), %error, "ignoring invalid client config");
                ClientConfig::default()
            }),
            Err(_) => ClientConfig::default(),
        };
        if let Ok(base_url) = env::var(BASE_URL_ENV)
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url.trim().to_string();
        }
        config
    }
}

/// Get the default path for the client configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bindery")
        .join("client.json")
}
