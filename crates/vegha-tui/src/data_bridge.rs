//! Data bridge: forwards [`ConnectionManager`] state and metrics to TUI actions.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use vegha_core::ConnectionManager;

use crate::action::Action;

fn connection_action(manager: &ConnectionManager) -> Action {
    Action::ConnectionChanged {
        state: manager.state(),
        reconnect: manager.reconnect_status(),
    }
}

/// Push the current state, then forward every change until cancelled.
pub async fn spawn_data_bridge(
    manager: ConnectionManager,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut state = manager.connection_state();
    let mut metrics = manager.metrics();

    let _ = action_tx.send(connection_action(&manager));
    let _ = action_tx.send(Action::MetricsUpdated {
        snapshot: metrics.current().clone(),
        received_at: manager.store().last_update(),
    });

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = state.changed() => {
                let _ = action_tx.send(connection_action(&manager));
            }
            Some(snapshot) = metrics.changed() => {
                let _ = action_tx.send(Action::MetricsUpdated {
                    snapshot,
                    received_at: manager.store().last_update(),
                });
            }
            else => break,
        }
    }

    debug!("data bridge shut down");
}
