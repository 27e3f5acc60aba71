//! CLI configuration: a thin wrapper around `vegha_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--backend, --profile, --timeout).

use std::time::Duration;

use vegha_core::BackendConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use vegha_config::{Config, Profile, config_path, load_config_or_default, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| vegha_config::DEFAULT_PROFILE.into())
}

/// Build a `BackendConfig` from the config file, profile, and CLI overrides.
///
/// Flags take priority over the profile, which takes priority over
/// `[defaults]`.
pub fn resolve_backend(global: &GlobalOpts, config: &Config) -> Result<BackendConfig, CliError> {
    let (_, mut profile) = config.profile(global.profile.as_deref())?;

    if let Some(ref backend) = global.backend {
        profile.backend.clone_from(backend);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }

    Ok(vegha_config::profile_to_backend_config(
        &profile,
        &config.defaults,
    )?)
}

/// Timeout actually in effect, for error messages.
pub fn timeout_secs(backend: &BackendConfig) -> u64 {
    backend.timeout.as_secs().max(1)
}

/// Upper bound for waiting on a one-shot handshake.
pub fn connect_deadline(backend: &BackendConfig) -> Duration {
    backend.timeout + Duration::from_secs(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["vegha"];
        argv.extend_from_slice(args);
        argv.push("bounds");
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_profile() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                backend: "http://sim.lab:5000".into(),
                timeout: Some(20),
                ..Profile::default()
            },
        );

        let backend = resolve_backend(&global(&[]), &cfg).unwrap();
        assert_eq!(backend.url.host_str(), Some("sim.lab"));
        assert_eq!(backend.timeout, Duration::from_secs(20));

        let backend = resolve_backend(
            &global(&["--backend", "http://10.1.1.1:5000", "--timeout", "4"]),
            &cfg,
        )
        .unwrap();
        assert_eq!(backend.url.host_str(), Some("10.1.1.1"));
        assert_eq!(backend.timeout, Duration::from_secs(4));
    }

    #[test]
    fn missing_named_profile_fails() {
        let err = resolve_backend(&global(&["--profile", "nope"]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::ProfileNotFound { .. }));
    }
}
