use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mediasync::PathMapping;
use mediasync_http::HttpRemoteConfig;
use mediasync_telegram::TelegramConfig;
use serde::Deserialize;
use url::Url;

/// File name looked up in each configuration directory.
pub const CONFIG_FILE_NAME: &str = "clientconfig.toml";

/// Environment variables that override secrets from the file.
pub const PASSWORD_ENV: &str = "MEDIASYNC_PASSWORD";
pub const TELEGRAM_TOKEN_ENV: &str = "MEDIASYNC_TELEGRAM_TOKEN";

/// Configuration file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub remote: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub root_mapping: Vec<MappingEntry>,
    pub telegram: TelegramSection,
}

/// One `[[root_mapping]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingEntry {
    pub remote_path: String,
    pub local_path: String,
}

/// The `[telegram]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSection {
    #[serde(default)]
    pub token: String,
    pub chat_id: i64,
    pub api_base_url: Option<String>,
}

/// Validated settings, ready to build the pipeline's collaborators from.
#[derive(Debug, Clone)]
pub struct Settings {
    pub remote: HttpRemoteConfig,
    pub mappings: Vec<PathMapping>,
    pub telegram: TelegramConfig,
}

/// Directories searched for `clientconfig.toml`, in order.
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("."), PathBuf::from("/etc/mediasync")];
    if let Some(config_dir) = dirs::config_dir() {
        dirs.push(config_dir.join("mediasync"));
    }
    dirs
}

/// Pick the configuration file: `explicit` if given, otherwise the first
/// `clientconfig.toml` found in `dirs`.
pub fn find_config(explicit: Option<&Path>, dirs: &[PathBuf]) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("config file {} does not exist", path.display());
        }
        return Ok(path.to_owned());
    }

    dirs.iter()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
        .with_context(|| {
            let searched: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
            format!(
                "no {CONFIG_FILE_NAME} found in {}",
                searched.join(", ")
            )
        })
}

/// Parse configuration file contents.
pub fn parse(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).context("invalid configuration")
}

impl AppConfig {
    /// Replace secrets with values from `lookup` where present.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(password) = lookup(PASSWORD_ENV) {
            self.password = password;
        }
        if let Some(token) = lookup(TELEGRAM_TOKEN_ENV) {
            self.telegram.token = token;
        }
    }

    /// Validate and convert into [`Settings`].
    pub fn into_settings(self) -> Result<Settings> {
        let base_url = Url::parse(&self.remote)
            .with_context(|| format!("remote {:?} is not an absolute URL", self.remote))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            bail!("remote {:?} must be an http(s) URL", self.remote);
        }

        if self.telegram.token.is_empty() {
            bail!("telegram.token is not set (or {TELEGRAM_TOKEN_ENV})");
        }

        let mappings = self
            .root_mapping
            .into_iter()
            .map(|m| PathMapping::new(m.remote_path, m.local_path))
            .collect();

        Ok(Settings {
            remote: HttpRemoteConfig {
                base_url,
                username: self.username,
                password: self.password,
            },
            mappings,
            telegram: TelegramConfig {
                token: self.telegram.token,
                chat_id: self.telegram.chat_id,
                api_base_url: self.telegram.api_base_url,
            },
        })
    }
}

/// Find, read, and validate the configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<Settings> {
    let path = find_config(explicit, &search_dirs())?;
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut config =
        parse(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
    config.apply_overrides(|key| std::env::var(key).ok());

    tracing::debug!(path = %path.display(), mappings = config.root_mapping.len(), "loaded configuration");
    config.into_settings()
}
