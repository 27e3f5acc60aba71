//! `vegha sim`: one-shot playback commands.

use std::time::Duration;

use owo_colors::OwoColorize;
use tracing::debug;

use vegha_core::{BackendConfig, ConnectionManager, PlaybackSpeed, SimulationCommand};

use crate::cli::{GlobalOpts, SimArgs, SimCommand};
use crate::error::CliError;
use crate::output;

use super::util;

/// Time left for the socket task to flush the command before the
/// runtime shuts down.
const FLUSH_GRACE: Duration = Duration::from_millis(200);

fn to_command(cmd: &SimCommand) -> Result<SimulationCommand, CliError> {
    Ok(match cmd {
        SimCommand::Start => SimulationCommand::Start,
        SimCommand::Pause => SimulationCommand::Pause,
        SimCommand::Reset => SimulationCommand::Reset,
        SimCommand::Speed { multiplier } => {
            SimulationCommand::Speed(PlaybackSpeed::from_multiplier(*multiplier)?)
        }
    })
}

fn confirmation(cmd: SimulationCommand) -> String {
    match cmd {
        SimulationCommand::Start => "Simulation started".into(),
        SimulationCommand::Pause => "Simulation paused".into(),
        SimulationCommand::Reset => "Simulation reset".into(),
        SimulationCommand::Speed(speed) => format!("Playback speed set to {speed}"),
    }
}

pub async fn handle(
    mut backend: BackendConfig,
    args: SimArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Validate before touching the network.
    let command = to_command(&args.command)?;

    // One-shot: fail on the first refused handshake.
    backend.reconnect.max_attempts = 0;
    let manager = ConnectionManager::with_socketio(backend);

    let result = send(&manager, command).await;
    manager.close();
    tokio::time::sleep(FLUSH_GRACE).await;
    manager.shutdown();
    result?;

    if !global.quiet {
        let msg = confirmation(command);
        if output::should_color(global.color) {
            eprintln!("{} {msg}", "✓".green());
        } else {
            eprintln!("{msg}");
        }
    }
    Ok(())
}

async fn send(manager: &ConnectionManager, command: SimulationCommand) -> Result<(), CliError> {
    util::connect(manager).await?;
    debug!(event = command.event_name(), "sending command");
    manager.execute(command).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::exit_code;

    #[test]
    fn rejects_off_step_speed() {
        let err = to_command(&SimCommand::Speed { multiplier: 0.7 }).unwrap_err();
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn speed_confirmation_names_multiplier() {
        let cmd = to_command(&SimCommand::Speed { multiplier: 1.5 }).unwrap();
        assert!(confirmation(cmd).contains("1.5"));
    }
}
