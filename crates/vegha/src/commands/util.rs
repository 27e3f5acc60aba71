//! Shared helpers for command handlers.

use vegha_core::{ConnectionManager, ConnectionState};

use crate::config;
use crate::error::CliError;

/// Open the manager's connection and wait until it is live.
///
/// Fails once the reconnect budget is spent or the handshake deadline
/// passes.
pub async fn connect(manager: &ConnectionManager) -> Result<(), CliError> {
    let backend = manager.config();
    let mut state = manager.connection_state();
    manager.open();

    let settled = tokio::time::timeout(
        config::connect_deadline(backend),
        state.wait_for(|s| {
            *s == ConnectionState::Connected
                || (*s == ConnectionState::Disconnected
                    && manager.reconnect_status().is_exhausted())
        }),
    )
    .await;

    match settled {
        Ok(Ok(s)) if *s == ConnectionState::Connected => Ok(()),
        Ok(_) => Err(CliError::ConnectionFailed {
            url: backend.url.to_string(),
            source: "Socket.IO handshake failed".into(),
        }),
        Err(_) => Err(CliError::Timeout {
            seconds: config::timeout_secs(backend),
        }),
    }
}
