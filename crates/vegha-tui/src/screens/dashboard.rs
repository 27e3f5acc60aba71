//! Dashboard screen: live metric cards, congestion gauge, playback state.
//!
//! ┌ Vehicles ┐┌ Avg speed ┐┌ Waiting ┐┌ Avg wait ┐
//! └──────────┘└───────────┘└─────────┘└──────────┘
//! ┌ Sim time ┐┌ Signals ──┐┌ Congestion ─────────┐
//! └──────────┘└───────────┘└─────────────────────┘
//!  ▶ running · 1.5x                  updated 2s ago

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph},
};

use vegha_core::{ConnectionState, MetricsSnapshot, PlaybackSpeed, SimulationCommand};

use crate::action::{Action, Notification};
use crate::component::Component;
use crate::theme;
use crate::widgets::metric_card::{self, MetricCard};

pub struct DashboardScreen {
    snapshot: Arc<MetricsSnapshot>,
    received_at: Option<DateTime<Utc>>,
    state: ConnectionState,
    playing: bool,
    speed: PlaybackSpeed,
}

impl DashboardScreen {
    pub fn new(snapshot: Arc<MetricsSnapshot>) -> Self {
        Self {
            snapshot,
            received_at: None,
            state: ConnectionState::Disconnected,
            playing: false,
            speed: PlaybackSpeed::default(),
        }
    }

    /// Emit a control command, but only over a live session.
    fn control(&self, command: SimulationCommand) -> Option<Action> {
        if self.state == ConnectionState::Connected {
            Some(Action::Send(command))
        } else {
            Some(Action::Notify(Notification::error(
                "not connected: press c to connect",
            )))
        }
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::vertical([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)]).split(area);
        let top = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(rows[0]);
        let bottom = Layout::horizontal([
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 4),
            Constraint::Ratio(1, 2),
        ])
        .split(rows[1]);

        let s = &self.snapshot;
        let cards = [
            (
                top[0],
                MetricCard {
                    title: "Vehicles",
                    value: s.vehicle_count.to_string(),
                    unit: "",
                },
            ),
            (
                top[1],
                MetricCard {
                    title: "Avg speed",
                    value: metric_card::decimal(s.avg_speed),
                    unit: "km/h",
                },
            ),
            (
                top[2],
                MetricCard {
                    title: "Waiting",
                    value: s.waiting.to_string(),
                    unit: "vehicles",
                },
            ),
            (
                top[3],
                MetricCard {
                    title: "Avg wait",
                    value: metric_card::decimal(s.avg_wait_time),
                    unit: "s",
                },
            ),
            (
                bottom[0],
                MetricCard {
                    title: "Sim time",
                    value: metric_card::sim_clock(s.sim_time),
                    unit: "",
                },
            ),
            (
                bottom[1],
                MetricCard {
                    title: "Signals",
                    value: s.signals.to_string(),
                    unit: "",
                },
            ),
        ];
        for (rect, card) in &cards {
            card.render(frame, *rect);
        }

        self.render_congestion(frame, bottom[2]);
    }

    fn render_congestion(&self, frame: &mut Frame, area: Rect) {
        let percent = self.snapshot.congestion_percent.clamp(0.0, 100.0);
        let block = Block::default()
            .title(" Congestion ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let gauge = Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(theme::congestion_color(percent)))
            .ratio(percent / 100.0)
            .label(format!("{percent:.1}%"));
        frame.render_widget(gauge, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let (symbol, label, color) = if self.playing {
            ("▶", "running", theme::SUCCESS_GREEN)
        } else {
            ("⏸", "paused", theme::ELECTRIC_YELLOW)
        };

        let left = Line::from(vec![
            Span::raw(" "),
            Span::styled(format!("{symbol} {label}"), Style::default().fg(color)),
            Span::styled(format!(" · {}", self.speed), theme::key_hint()),
        ]);
        let right = Line::from(Span::styled(
            format!("{} ", data_age(self.received_at, Utc::now())),
            theme::key_hint(),
        ))
        .right_aligned();

        frame.render_widget(Paragraph::new(left), area);
        frame.render_widget(Paragraph::new(right), area);
    }
}

impl Component for DashboardScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers != KeyModifiers::NONE && key.modifiers != KeyModifiers::SHIFT {
            return Ok(None);
        }
        Ok(match key.code {
            KeyCode::Char(' ') => Some(Action::TogglePlayback),
            KeyCode::Char('x') => Some(Action::ResetSimulation),
            KeyCode::Char('+' | '=') => Some(Action::CycleSpeed),
            _ => None,
        })
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        let follow_up = match action {
            Action::MetricsUpdated {
                snapshot,
                received_at,
            } => {
                self.snapshot = Arc::clone(snapshot);
                self.received_at = *received_at;
                None
            }
            Action::ConnectionChanged { state, .. } => {
                self.state = *state;
                None
            }
            Action::TogglePlayback => {
                let command = if self.playing {
                    SimulationCommand::Pause
                } else {
                    SimulationCommand::Start
                };
                let follow_up = self.control(command);
                if self.state == ConnectionState::Connected {
                    self.playing = !self.playing;
                }
                follow_up
            }
            Action::ResetSimulation => {
                let follow_up = self.control(SimulationCommand::Reset);
                if self.state == ConnectionState::Connected {
                    self.playing = false;
                }
                follow_up
            }
            Action::CycleSpeed => {
                let next = self.speed.next();
                let follow_up = self.control(SimulationCommand::Speed(next));
                if self.state == ConnectionState::Connected {
                    self.speed = next;
                }
                follow_up
            }
            _ => None,
        };
        Ok(follow_up)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::vertical([Constraint::Min(6), Constraint::Length(1)]).split(area);
        self.render_cards(frame, layout[0]);
        self.render_footer(frame, layout[1]);
    }
}

/// "updated 3s ago", or "no data" while the store holds defaults.
fn data_age(received_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = received_at else {
        return "no data".into();
    };
    let secs = u64::try_from((now - at).num_seconds()).unwrap_or(0);
    if secs == 0 {
        "updated just now".into()
    } else {
        format!(
            "updated {} ago",
            humantime::format_duration(Duration::from_secs(secs))
        )
    }
}
