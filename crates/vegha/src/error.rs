//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use vegha_config::ConfigError;
use vegha_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_RUNNING: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to simulation backend at {url}")]
    #[diagnostic(
        code(vegha::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             URL: {url}\n\
             Try: vegha --backend http://<host>:5000 watch"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Lost connection to {url} after {attempts} reconnect attempts")]
    #[diagnostic(
        code(vegha::connection_lost),
        help("Raise --reconnect-attempts or reconnect_attempts in your profile to keep retrying.")
    )]
    ConnectionLost { url: String, attempts: u32 },

    #[error("Not connected to the simulation backend")]
    #[diagnostic(code(vegha::not_connected))]
    NotConnected,

    // ── Simulation ───────────────────────────────────────────────────

    #[error("Simulation is not running: {message}")]
    #[diagnostic(
        code(vegha::simulation_not_running),
        help("Start it with: vegha sim start")
    )]
    SimulationNotRunning { message: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Backend error: {message}")]
    #[diagnostic(code(vegha::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vegha::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vegha::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: vegha config init --name {name} --url <backend>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Profile '{name}' already exists")]
    #[diagnostic(
        code(vegha::profile_exists),
        help("Pass --force to replace it.")
    )]
    ProfileExists { name: String },

    #[error(transparent)]
    #[diagnostic(code(vegha::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Timed out after {seconds}s")]
    #[diagnostic(
        code(vegha::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(vegha::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(vegha::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(vegha::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ConnectionLost { .. } | Self::NotConnected => {
                exit_code::CONNECTION
            }
            Self::SimulationNotRunning { .. } => exit_code::NOT_RUNNING,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::ProfileExists { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::NotConnected => CliError::NotConnected,

            CoreError::Timeout { timeout_ms } => CliError::Timeout {
                seconds: timeout_ms.div_ceil(1000),
            },

            CoreError::SimulationNotRunning { message } => {
                CliError::SimulationNotRunning { message }
            }

            CoreError::InvalidCommand { message } => CliError::Validation {
                field: "command".into(),
                reason: message,
            },

            CoreError::Api { message, status } => CliError::ApiError {
                message: status.map_or_else(|| message.clone(), |s| format!("HTTP {s}: {message}")),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => {
                let cfg = vegha_config::load_config_or_default();
                let mut names: Vec<_> = cfg.profiles.into_keys().collect();
                names.sort();
                let available = if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                };
                CliError::ProfileNotFound { name, available }
            }
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_category() {
        assert_eq!(CliError::NotConnected.exit_code(), exit_code::CONNECTION);
        assert_eq!(
            CliError::from(CoreError::SimulationNotRunning {
                message: "idle".into()
            })
            .exit_code(),
            exit_code::NOT_RUNNING
        );
        assert_eq!(
            CliError::from(CoreError::InvalidCommand {
                message: "speed".into()
            })
            .exit_code(),
            exit_code::USAGE
        );
        assert_eq!(
            CliError::from(CoreError::Timeout { timeout_ms: 2500 }).to_string(),
            "Timed out after 3s"
        );
    }
}
