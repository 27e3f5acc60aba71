//! Config subcommand handlers.

use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Backend")]
    backend: String,
    #[tabled(rename = "Timeout")]
    timeout: String,
    #[tabled(rename = "Retries")]
    retries: String,
}

#[derive(serde::Serialize)]
struct ProfileEntry<'a> {
    name: &'a str,
    default: bool,
    #[serde(flatten)]
    profile: &'a Profile,
}

fn sorted_profiles(cfg: &Config) -> Vec<ProfileEntry<'_>> {
    let default = cfg.default_profile.as_deref();
    let mut entries: Vec<_> = cfg
        .profiles
        .iter()
        .map(|(name, profile)| ProfileEntry {
            name,
            default: Some(name.as_str()) == default,
            profile,
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(b.name));
    entries
}

fn render_config(format: OutputFormat, cfg: &Config) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(cfg)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(cfg)?),
        OutputFormat::Yaml => output::render_yaml(cfg),
        OutputFormat::Table | OutputFormat::Plain => Ok(toml::to_string_pretty(cfg)?),
    }
}

fn render_profiles(format: OutputFormat, cfg: &Config) -> Result<String, CliError> {
    let defaults = &cfg.defaults;
    output::render_list(
        format,
        &sorted_profiles(cfg),
        |e| ProfileRow {
            marker: if e.default { "*" } else { "" },
            name: e.name.to_owned(),
            backend: e.profile.backend.clone(),
            timeout: format!("{}s", e.profile.timeout.unwrap_or(defaults.timeout)),
            retries: e
                .profile
                .reconnect_attempts
                .unwrap_or(defaults.reconnect_attempts)
                .to_string(),
        },
        |e| {
            let marker = if e.default { " *" } else { "" };
            format!("{}{marker}\t{}", e.name, e.profile.backend)
        },
    )
}

fn profile_not_found(name: String, cfg: &Config) -> CliError {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    CliError::ProfileNotFound {
        name,
        available: if names.is_empty() {
            "(none)".into()
        } else {
            names.join(", ")
        },
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init {
            name,
            url,
            static_signals,
            force,
        } => {
            let mut cfg = config::load_config_or_default();
            if cfg.profiles.contains_key(&name) && !force {
                return Err(CliError::ProfileExists { name });
            }

            let profile = Profile {
                backend: url,
                static_signals,
                ..Profile::default()
            };
            // Reject a bad URL before it reaches disk.
            vegha_config::profile_to_backend_config(&profile, &cfg.defaults)?;

            cfg.profiles.insert(name.clone(), profile);
            if cfg
                .default_profile
                .as_ref()
                .is_none_or(|d| !cfg.profiles.contains_key(d))
            {
                cfg.default_profile = Some(name.clone());
            }

            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Profile '{name}' written to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = render_config(global.output, &cfg)?;
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: vegha config init");
                return Ok(());
            }
            let out = render_profiles(global.output, &cfg)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(name, &cfg));
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Config {
        let mut cfg = Config {
            default_profile: Some("lab".into()),
            ..Config::default()
        };
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                backend: "http://sim.lab:5000".into(),
                timeout: Some(3),
                ..Profile::default()
            },
        );
        cfg.profiles.insert("demo".into(), Profile::default());
        cfg
    }

    #[test]
    fn profiles_sorted_and_marked() {
        let out = render_profiles(OutputFormat::Plain, &sample()).unwrap();
        assert_eq!(
            out,
            "demo\thttp://localhost:5000\nlab *\thttp://sim.lab:5000"
        );
    }

    #[test]
    fn show_as_toml_round_trips() {
        let cfg = sample();
        let out = render_config(OutputFormat::Table, &cfg).unwrap();
        let parsed: Config = toml::from_str(&out).unwrap();
        assert_eq!(parsed, cfg);
    }
}
