//! `vegha-tui`: live terminal dashboard for a Vegha traffic simulation.
//!
//! Built on [ratatui](https://ratatui.rs). A background data bridge forwards
//! the connection manager's state and metrics into the app's action loop.
//!
//! Logs go to a file (default `/tmp/vegha-tui.log`) so they never corrupt
//! the terminal.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vegha_core::{BackendConfig, ConnectionManager};

use crate::app::App;

/// Terminal dashboard for live traffic simulation metrics.
#[derive(Parser, Debug)]
#[command(name = "vegha-tui", version, about)]
struct Cli {
    /// Config profile to use
    #[arg(short = 'p', long, env = "VEGHA_PROFILE")]
    profile: Option<String>,

    /// Backend base URL (overrides profile)
    #[arg(short = 'b', long, env = "VEGHA_BACKEND")]
    backend: Option<String>,

    /// Log file path
    #[arg(long, default_value = "/tmp/vegha-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-only tracing. Hold the guard for the app's lifetime so logs flush.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vegha_tui={log_level},vegha_core={log_level},vegha_api={log_level}"
        ))
    });

    let log_dir = cli.log_file.parent().unwrap_or(Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("vegha-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// Profile from the shared config file, with `--backend` on top.
fn resolve_backend(cli: &Cli) -> Result<BackendConfig> {
    let cfg = vegha_config::load_config_or_default();
    let (_, mut profile) = cfg.profile(cli.profile.as_deref())?;
    if let Some(ref backend) = cli.backend {
        profile.backend.clone_from(backend);
    }
    Ok(vegha_config::profile_to_backend_config(
        &profile,
        &cfg.defaults,
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let backend = resolve_backend(&cli)?;
    info!(url = %backend.url, "starting vegha-tui");

    let manager = ConnectionManager::with_socketio(backend);
    let mut app = App::new(manager);
    app.run().await?;

    Ok(())
}
