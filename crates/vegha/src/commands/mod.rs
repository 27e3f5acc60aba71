//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod bounds;
pub mod config_cmd;
pub mod sim;
pub mod util;
pub mod watch;

use vegha_core::BackendConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    backend: BackendConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(backend, args, global).await,
        Command::Bounds => bounds::handle(&backend, global).await,
        Command::Sim(args) => sim::handle(backend, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
