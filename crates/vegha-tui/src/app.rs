//! Application core: event loop and action dispatch.

use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vegha_core::{ConnectionManager, ConnectionState, ReconnectStatus};

use crate::action::{Action, Notification, NotificationLevel};
use crate::component::Component;
use crate::data_bridge::spawn_data_bridge;
use crate::event::{self, Event};
use crate::screens::dashboard::DashboardScreen;
use crate::theme;
use crate::tui::Tui;
use crate::widgets::status_indicator;

const NOTIFICATION_TTL: Duration = Duration::from_secs(5);
const TICK_RATE: Duration = Duration::from_secs(1);

pub struct App {
    manager: ConnectionManager,
    dashboard: DashboardScreen,
    running: bool,
    help_visible: bool,
    state: ConnectionState,
    reconnect: ReconnectStatus,
    notification: Option<(Notification, Instant)>,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(manager: ConnectionManager) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let dashboard = DashboardScreen::new(manager.snapshot());

        Self {
            manager,
            dashboard,
            running: true,
            help_visible: false,
            state: ConnectionState::Disconnected,
            reconnect: ReconnectStatus::Idle,
            notification: None,
            action_tx,
            action_rx,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::enter()?;

        let cancel = CancellationToken::new();
        tokio::spawn(spawn_data_bridge(
            self.manager.clone(),
            self.action_tx.clone(),
            cancel.clone(),
        ));
        self.manager.open();

        let mut events = event::events(TICK_RATE);
        info!(url = %self.manager.config().url, "TUI event loop started");

        while self.running {
            tui.draw(|frame| self.render(frame))?;

            let action = tokio::select! {
                event = events.next() => match event {
                    Some(event) => self.event_action(event)?,
                    None => break,
                },
                action = self.action_rx.recv() => action,
            };

            // Apply everything already queued before the next frame.
            if let Some(action) = action {
                self.process_action(&action)?;
            }
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;
            }
        }

        cancel.cancel();
        self.manager.shutdown();
        info!("TUI event loop ended");
        Ok(())
    }

    fn event_action(&mut self, event: Event) -> Result<Option<Action>> {
        match event {
            Event::Key(key) => self.handle_key_event(key),
            Event::Tick => Ok(Some(Action::Tick)),
            // The next frame is laid out at the new size.
            Event::Resize => Ok(None),
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        if let Some(action) = global_key(key) {
            return Ok(Some(action));
        }
        self.dashboard.handle_key_event(key)
    }

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::Tick => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, at)| at.elapsed() >= NOTIFICATION_TTL)
                {
                    self.notification = None;
                }
            }

            Action::Refresh => {
                debug!("manual refresh");
                self.manager.refresh();
                self.action_tx
                    .send(Action::Notify(Notification::info("reconnecting")))?;
            }

            Action::ToggleConnection => {
                if self.state.is_active() {
                    self.manager.close();
                } else {
                    self.manager.open();
                }
            }

            Action::Send(command) => {
                let manager = self.manager.clone();
                let tx = self.action_tx.clone();
                let command = *command;
                tokio::spawn(async move {
                    if let Err(e) = manager.execute(command).await {
                        warn!(error = %e, event = command.event_name(), "command failed");
                        let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                    }
                });
            }

            Action::Notify(notification) => {
                self.notification = Some((notification.clone(), Instant::now()));
            }

            other => {
                if let Action::ConnectionChanged { state, reconnect } = other {
                    self.state = *state;
                    self.reconnect = *reconnect;
                }
                if let Some(follow_up) = self.dashboard.update(other)? {
                    self.action_tx.send(follow_up)?;
                }
            }
        }

        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let layout = Layout::vertical([
            Constraint::Length(1), // Title
            Constraint::Min(1),    // Dashboard
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        self.render_title(frame, layout[0]);
        self.dashboard.render(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);

        if self.help_visible {
            render_help_overlay(frame, area);
        }
    }

    fn render_title(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(" Vegha ", theme::title_style()),
            Span::styled(self.manager.config().url.to_string(), theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::raw(" "),
            status_indicator::status_span(self.state, self.reconnect),
        ];

        match &self.notification {
            Some((n, _)) => {
                let color = match n.level {
                    NotificationLevel::Info => theme::NEON_CYAN,
                    NotificationLevel::Error => theme::ERROR_RED,
                };
                spans.push(Span::styled(
                    format!(" │ {}", n.message),
                    Style::default().fg(color),
                ));
            }
            None => spans.push(Span::styled(
                " │ space play/pause  + speed  c connect  ? help  q quit",
                theme::key_hint(),
            )),
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

/// Keys handled regardless of screen.
fn global_key(key: KeyEvent) -> Option<Action> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (KeyModifiers::NONE, KeyCode::Char('q')) => {
            Some(Action::Quit)
        }
        (KeyModifiers::NONE, KeyCode::Char('?')) => Some(Action::ToggleHelp),
        (KeyModifiers::NONE, KeyCode::Char('r')) => Some(Action::Refresh),
        (KeyModifiers::NONE, KeyCode::Char('c')) => Some(Action::ToggleConnection),
        _ => None,
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = 44u16.min(area.width.saturating_sub(4));
    let height = 12u16.min(area.height.saturating_sub(2));
    let help_area = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    );

    frame.render_widget(Clear, help_area);

    let block = Block::default()
        .title(" Keyboard Shortcuts ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
        .style(Style::default().bg(theme::BG_DARK));

    let row = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {key:<9}"), theme::key_hint_key()),
            Span::styled(what, theme::key_hint()),
        ])
    };
    let lines = vec![
        Line::from(""),
        row("space", "Start / pause simulation"),
        row("+", "Next playback speed"),
        row("x", "Reset simulation"),
        row("r", "Reconnect"),
        row("c", "Connect / disconnect"),
        row("?", "This help"),
        row("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  Esc or ? to close", theme::key_hint())),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), help_area);
}
