//! Terminal input merged with a slow tick.
//!
//! The dashboard only changes on input, on data from the bridge, or when the
//! data-age readout rolls over, so there is no render interval: the app
//! redraws after each batch of work. A resize is surfaced so the next frame
//! picks up the new size.

use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::{Stream, StreamExt, stream};
use tokio::time::{MissedTickBehavior, interval};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Resize,
    /// Drives the data-age readout and notification expiry.
    Tick,
}

/// Keep key presses and resizes; drop releases, repeats, mouse and focus.
fn from_terminal(event: CrosstermEvent) -> Option<Event> {
    match event {
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        CrosstermEvent::Resize(..) => Some(Event::Resize),
        _ => None,
    }
}

/// Terminal events interleaved with a tick every `tick_rate`.
///
/// Must be called from within a Tokio runtime.
pub fn events(tick_rate: Duration) -> impl Stream<Item = Event> + Unpin {
    let input = EventStream::new().filter_map(|event| async move {
        match event {
            Ok(event) => from_terminal(event),
            Err(e) => {
                warn!(error = %e, "failed to read terminal input");
                None
            }
        }
    });

    let mut ticker = interval(tick_rate);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ticks = stream::unfold(ticker, |mut ticker| async move {
        ticker.tick().await;
        Some((Event::Tick, ticker))
    });

    Box::pin(stream::select(input, ticks))
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyModifiers};

    use super::*;

    #[test]
    fn only_presses_and_resizes_pass() {
        let press = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(
            from_terminal(CrosstermEvent::Key(press)),
            Some(Event::Key(press))
        );

        let release =
            KeyEvent::new_with_kind(KeyCode::Char('q'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(from_terminal(CrosstermEvent::Key(release)), None);

        assert_eq!(
            from_terminal(CrosstermEvent::Resize(120, 40)),
            Some(Event::Resize)
        );
        assert_eq!(from_terminal(CrosstermEvent::FocusGained), None);
    }
}
