//! `vegha watch`: stream live metrics.

use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use vegha_core::{
    BackendConfig, ConnectionManager, ConnectionState, ReconnectStatus, StateTransition,
};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    mut backend: BackendConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(attempts) = args.reconnect_attempts {
        backend.reconnect.max_attempts = attempts;
    }

    let manager = ConnectionManager::with_socketio(backend);
    let result = stream(&manager, args.count, global).await;
    manager.shutdown();
    result
}

/// Attempts spent when `t` settles the connection for good.
fn gave_up(t: StateTransition) -> Option<u32> {
    match (t.to, t.reconnect) {
        (ConnectionState::Disconnected, ReconnectStatus::Exhausted { attempts }) => Some(attempts),
        _ => None,
    }
}

async fn stream(
    manager: &ConnectionManager,
    count: Option<u64>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let mut transitions = manager.transitions();
    let mut metrics = manager.metrics();
    let mut printed = 0_u64;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    manager.open();

    loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => {
                debug!("interrupted");
                return Ok(());
            }
            transition = transitions.recv() => match transition {
                Ok(t) => {
                    if !global.quiet {
                        eprintln!("{}", output::status_line(t.to, t.reconnect, color));
                    }
                    if let Some(attempts) = gave_up(t) {
                        return Err(CliError::ConnectionLost {
                            url: manager.config().url.to_string(),
                            attempts,
                        });
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "status feed lagged"),
                Err(RecvError::Closed) => return Ok(()),
            },
            snapshot = metrics.changed() => {
                let Some(snapshot) = snapshot else {
                    return Ok(());
                };
                // Stale data was discarded; nothing new to show.
                if manager.store().is_default() {
                    continue;
                }
                let rendered = output::render_snapshot(global.output, &snapshot, color)?;
                output::print_output(&rendered, false);

                printed += 1;
                if count.is_some_and(|n| printed >= n) {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gives_up_only_on_exhausted_disconnect() {
        let settled = StateTransition {
            from: ConnectionState::Error,
            to: ConnectionState::Disconnected,
            reconnect: ReconnectStatus::Exhausted { attempts: 5 },
        };
        assert_eq!(gave_up(settled), Some(5));

        // Server close with a retry still pending.
        let pending = StateTransition {
            from: ConnectionState::Connected,
            to: ConnectionState::Disconnected,
            reconnect: ReconnectStatus::Retrying {
                attempt: 1,
                max_attempts: 5,
            },
        };
        assert_eq!(gave_up(pending), None);

        let failed = StateTransition {
            to: ConnectionState::Error,
            ..settled
        };
        assert_eq!(gave_up(failed), None);
    }
}
