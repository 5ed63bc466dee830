//! Configuration source: defaults, then `shopping.toml`, then environment.

use std::{fs, path::Path};

use tracing::warn;

use crate::store::BackendMode;

pub const DEFAULT_NAMESPACE: &str = "default-app-id";
pub const DEFAULT_CONFIG_FILE: &str = "shopping.toml";

/// Server URL values meaning "no document store configured".
const NO_BACKEND_SENTINELS: &[&str] = &["", "none", "local"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Local,
    Remote {
        server_url: String,
        auth_token: Option<String>,
    },
}

impl BackendConfig {
    /// Picks the backend from a configured server URL, falling back to the
    /// local store for missing or sentinel values.
    pub fn from_server_url(server_url: Option<&str>, auth_token: Option<String>) -> Self {
        match server_url.map(str::trim) {
            Some(url) if !NO_BACKEND_SENTINELS.contains(&url.to_ascii_lowercase().as_str()) => {
                Self::Remote {
                    server_url: url.to_string(),
                    auth_token: auth_token.filter(|token| !token.trim().is_empty()),
                }
            }
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConfig {
    pub namespace: String,
    pub backend: BackendConfig,
    pub seed_mock_data: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            backend: BackendConfig::Local,
            seed_mock_data: true,
        }
    }
}

impl ListConfig {
    pub fn mode(&self) -> BackendMode {
        match self.backend {
            BackendConfig::Local => BackendMode::Local,
            BackendConfig::Remote { .. } => BackendMode::Remote,
        }
    }
}

#[derive(Debug, Default)]
struct RawConfig {
    namespace: Option<String>,
    server_url: Option<String>,
    auth_token: Option<String>,
    seed_mock_data: Option<bool>,
}

impl RawConfig {
    fn into_config(self) -> ListConfig {
        let defaults = ListConfig::default();
        ListConfig {
            namespace: self
                .namespace
                .map(|ns| ns.trim().to_string())
                .filter(|ns| !ns.is_empty())
                .unwrap_or(defaults.namespace),
            backend: BackendConfig::from_server_url(self.server_url.as_deref(), self.auth_token),
            seed_mock_data: self.seed_mock_data.unwrap_or(defaults.seed_mock_data),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> ListConfig {
    let mut raw = RawConfig::default();
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if let Ok(contents) = fs::read_to_string(path) {
        apply_file(&mut raw, &contents);
    }
    apply_env(&mut raw, |key| std::env::var(key).ok());
    raw.into_config()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn apply_file(raw: &mut RawConfig, contents: &str) {
    let table = match contents.parse::<toml::Table>() {
        Ok(table) => table,
        Err(err) => {
            warn!(%err, "ignoring malformed configuration file");
            return;
        }
    };
    let text = |key: &str| table.get(key).and_then(|v| v.as_str()).map(str::to_string);
    if let Some(v) = text("namespace") {
        raw.namespace = Some(v);
    }
    if let Some(v) = text("server_url") {
        raw.server_url = Some(v);
    }
    if let Some(v) = text("auth_token") {
        raw.auth_token = Some(v);
    }
    if let Some(v) = table.get("seed_mock_data") {
        raw.seed_mock_data = v.as_bool().or_else(|| v.as_str().and_then(parse_bool));
    }
}

fn apply_env(raw: &mut RawConfig, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["SHOPPING_NAMESPACE", "APP__NAMESPACE"] {
        if let Some(v) = lookup(key) {
            raw.namespace = Some(v);
        }
    }
    for key in ["SHOPPING_SERVER_URL", "APP__SERVER_URL"] {
        if let Some(v) = lookup(key) {
            raw.server_url = Some(v);
        }
    }
    for key in ["SHOPPING_AUTH_TOKEN", "APP__AUTH_TOKEN"] {
        if let Some(v) = lookup(key) {
            raw.auth_token = Some(v);
        }
    }
    if let Some(v) = lookup("APP__SEED_MOCK_DATA").as_deref().and_then(parse_bool) {
        raw.seed_mock_data = Some(v);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
