//! Terminal session guard.
//!
//! Raw mode and the alternate screen are held for as long as a [`Tui`]
//! lives. Dropping it, a failed setup step, or a panic all hand the
//! terminal back.

use std::io::{Stdout, stdout};

use color_eyre::eyre::Result;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};

pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    /// Take over the terminal.
    pub fn enter() -> Result<Self> {
        let mut tui = Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout()))?,
        };
        // Any `?` below drops `tui`, which restores the terminal.
        terminal::enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, cursor::Hide)?;
        tui.terminal.clear()?;
        Ok(tui)
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        leave();
    }
}

/// Best effort: every step runs even if an earlier one fails.
fn leave() {
    let _ = execute!(stdout(), cursor::Show);
    let _ = execute!(stdout(), LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

/// Install color-eyre hooks that restore the terminal before reporting.
///
/// Call before [`Tui::enter`] so setup failures print cleanly too.
pub fn install_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .into_hooks();

    eyre_hook.install()?;

    let panic_hook = panic_hook.into_panic_hook();
    std::panic::set_hook(Box::new(move |info| {
        leave();
        panic_hook(info);
    }));

    Ok(())
}
