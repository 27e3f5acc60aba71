//! Connection status indicator: ●/◐/○ with color mapping.

use ratatui::style::Style;
use ratatui::text::Span;
use vegha_core::{ConnectionState, ReconnectStatus};

use crate::theme;

pub fn status_char(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connected => "●",
        ConnectionState::Connecting => "◐",
        ConnectionState::Error | ConnectionState::Disconnected => "○",
    }
}

/// Status text, including reconnect progress while a retry is pending.
pub fn status_label(state: ConnectionState, reconnect: ReconnectStatus) -> String {
    match (state, reconnect) {
        (ConnectionState::Connected, _) | (_, ReconnectStatus::Idle) => state.to_string(),
        (
            _,
            ReconnectStatus::Retrying {
                attempt,
                max_attempts,
            },
        ) => format!("{state} · retry {attempt}/{max_attempts}"),
        (_, ReconnectStatus::Exhausted { attempts }) => {
            format!("{state} · gave up after {attempts}")
        }
    }
}

pub fn status_span(state: ConnectionState, reconnect: ReconnectStatus) -> Span<'static> {
    let color = match state {
        ConnectionState::Connected => theme::SUCCESS_GREEN,
        ConnectionState::Connecting => theme::ELECTRIC_YELLOW,
        ConnectionState::Error => theme::ERROR_RED,
        ConnectionState::Disconnected => theme::BORDER_GRAY,
    };
    Span::styled(
        format!("{} {}", status_char(state), status_label(state, reconnect)),
        Style::default().fg(color),
    )
}
