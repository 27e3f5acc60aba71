//! Clap derive structures for the `vegha` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vegha -- live metrics and control for a Vegha traffic simulation
#[derive(Debug, Parser)]
#[command(
    name = "vegha",
    version,
    about = "Watch and control a Vegha traffic simulation from the command line",
    long_about = "Streams live traffic metrics from a Vegha simulation backend over\n\
        Socket.IO and sends playback commands (start, pause, reset, speed).",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "VEGHA_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides profile)
    #[arg(long, short = 'b', env = "VEGHA_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VEGHA_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Handshake and request timeout in seconds (overrides profile)
    #[arg(long, env = "VEGHA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON (one object per update)
    JsonCompact,
    /// YAML
    Yaml,
    /// Tab-separated values (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream live metrics until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Show the geographic bounds of the simulated network
    Bounds,

    /// Control simulation playback
    #[command(alias = "s")]
    Sim(SimArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<u64>,

    /// Automatic reconnect attempts after a connection loss (overrides profile)
    #[arg(long)]
    pub reconnect_attempts: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SIM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SimArgs {
    #[command(subcommand)]
    pub command: SimCommand,
}

#[derive(Debug, Subcommand)]
pub enum SimCommand {
    /// Start or resume the simulation
    Start,

    /// Pause the simulation
    Pause,

    /// Reset the simulation to its initial state
    Reset,

    /// Set playback speed
    Speed {
        /// Multiplier, 0.5 to 3 in steps of 0.5
        multiplier: f64,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile in the config file
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Backend base URL for the profile
        #[arg(long = "url", default_value = "http://localhost:5000")]
        url: String,

        /// Signal count to report when updates carry no traffic lights
        #[arg(long)]
        static_signals: Option<u64>,

        /// Replace an existing profile with the same name
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sim_speed() {
        let cli = Cli::try_parse_from(["vegha", "-o", "json", "sim", "speed", "1.5"]).unwrap();
        assert_eq!(cli.global.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Command::Sim(SimArgs {
                command: SimCommand::Speed { multiplier }
            }) if (multiplier - 1.5).abs() < f64::EPSILON
        ));
    }
}
