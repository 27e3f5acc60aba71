//! A bordered card showing one headline number.

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::theme;

pub struct MetricCard<'a> {
    pub title: &'a str,
    pub value: String,
    pub unit: &'a str,
}

impl MetricCard<'_> {
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(" {} ", self.title))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut spans = vec![Span::styled(self.value.clone(), theme::metric_value())];
        if !self.unit.is_empty() {
            spans.push(Span::styled(format!(" {}", self.unit), theme::metric_unit()));
        }

        // Vertically center the single line.
        let pad = inner.height.saturating_sub(1) / 2;
        let line_area = Rect {
            y: inner.y + pad,
            height: inner.height.min(1),
            ..inner
        };
        frame.render_widget(
            Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
            line_area,
        );
    }
}

/// One decimal place, the way every float metric is shown.
pub fn decimal(value: f64) -> String {
    format!("{value:.1}")
}

/// Simulation clock as `m:ss`, or `h:mm:ss` past the hour.
pub fn sim_clock(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    let total = seconds.max(0.0).floor() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn clock_formats() {
        assert_eq!(sim_clock(0.0), "0:00");
        assert_eq!(sim_clock(118.9), "1:58");
        assert_eq!(sim_clock(3725.0), "1:02:05");
    }

    #[test]
    fn decimals_round() {
        assert_eq!(decimal(27.04), "27.0");
        assert_eq!(decimal(37.54), "37.5");
    }
}
