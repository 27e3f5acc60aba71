//! Shared configuration for the Vegha CLI and TUI.
//!
//! TOML profiles layered with environment overrides, and translation to
//! `vegha_core::BackendConfig`. Both binaries depend on this crate; the CLI
//! applies its own flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vegha_core::{BackendConfig, DEFAULT_BACKEND_URL, ReconnectPolicy};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{name}'")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named explicitly.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some(DEFAULT_PROFILE.into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Handshake and request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Automatic reconnect attempts after a connection loss.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_reconnect_attempts() -> u32 {
    5
}
fn default_reconnect_delay_ms() -> u64 {
    1000
}

/// A named backend profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Simulation backend base URL (e.g., "http://localhost:5000").
    pub backend: String,

    /// Signal count reported when updates carry no traffic-light data.
    pub static_signals: Option<u64>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override reconnect attempts.
    pub reconnect_attempts: Option<u32>,

    /// Override reconnect delay.
    pub reconnect_delay_ms: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND_URL.into(),
            static_signals: None,
            timeout: None,
            reconnect_attempts: None,
            reconnect_delay_ms: None,
        }
    }
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`.
    ///
    /// An explicitly named profile must exist. The implicit default may be
    /// missing, in which case a local-backend profile is returned.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        if let Some(name) = name {
            return self
                .profiles
                .get(name)
                .map(|p| (name.to_owned(), p.clone()))
                .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() });
        }

        let name = self
            .default_profile
            .clone()
            .unwrap_or_else(|| DEFAULT_PROFILE.into());
        let profile = self.profiles.get(&name).cloned().unwrap_or_default();
        Ok((name, profile))
    }

    /// Resolve a profile straight to a `BackendConfig`.
    pub fn backend_config(&self, name: Option<&str>) -> Result<BackendConfig, ConfigError> {
        let (_, profile) = self.profile(name)?;
        profile_to_backend_config(&profile, &self.defaults)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "vegha", "vegha").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vegha");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` layered over defaults, then `VEGHA_*` environment
/// variables (`VEGHA_DEFAULTS__TIMEOUT=5`). A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VEGHA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `BackendConfig` from a profile, filling gaps from `defaults`.
pub fn profile_to_backend_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<BackendConfig, ConfigError> {
    let url: url::Url = profile
        .backend
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "backend".into(),
            reason: format!("invalid URL: {}", profile.backend),
        })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "backend".into(),
            reason: format!("expected an http or https URL, got '{}'", url.scheme()),
        });
    }

    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let mut config = BackendConfig::new(url);
    config.timeout = Duration::from_secs(timeout);
    config.reconnect = ReconnectPolicy {
        delay: Duration::from_millis(
            profile
                .reconnect_delay_ms
                .unwrap_or(defaults.reconnect_delay_ms),
        ),
        max_attempts: profile
            .reconnect_attempts
            .unwrap_or(defaults.reconnect_attempts),
    };
    config.static_signal_count = profile.static_signals;
    Ok(config)
}
