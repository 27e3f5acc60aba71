//! Output formatting: human, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Tables use `tabled`,
//! structured formats use serde, plain emits tab-separated values.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use vegha_core::{ConnectionState, MetricsSnapshot, ReconnectStatus};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&plain_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render one live snapshot. Each call yields one self-contained record
/// so a stream of them can be piped line by line (`json-compact`, `plain`).
pub fn render_snapshot(
    format: OutputFormat,
    snapshot: &MetricsSnapshot,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(snapshot_line(snapshot, color)),
        OutputFormat::Json => render_json(snapshot, false),
        OutputFormat::JsonCompact => render_json(snapshot, true),
        OutputFormat::Yaml => Ok(format!("---\n{}", render_yaml(snapshot)?)),
        OutputFormat::Plain => Ok(snapshot_plain(snapshot)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Snapshot formats ─────────────────────────────────────────────────

fn snapshot_line(s: &MetricsSnapshot, color: bool) -> String {
    let fields = [
        ("t", format!("{:.1}s", s.sim_time)),
        ("vehicles", s.vehicle_count.to_string()),
        ("speed", format!("{:.1} km/h", s.avg_speed)),
        ("waiting", s.waiting.to_string()),
        ("wait", format!("{:.1}s", s.avg_wait_time)),
        ("signals", s.signals.to_string()),
        ("congestion", format!("{:.1}%", s.congestion_percent)),
    ];

    fields
        .iter()
        .map(|(label, value)| {
            if color {
                format!("{} {}", label.dimmed(), value.bold())
            } else {
                format!("{label} {value}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn snapshot_plain(s: &MetricsSnapshot) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        s.sim_time,
        s.vehicle_count,
        s.avg_speed,
        s.waiting,
        s.signals,
        s.avg_wait_time,
        s.congestion_percent
    )
}

/// One-line connection status for stderr.
pub fn status_line(state: ConnectionState, reconnect: ReconnectStatus, color: bool) -> String {
    let detail = match (state, reconnect) {
        (ConnectionState::Connected, _) | (_, ReconnectStatus::Idle) => String::new(),
        (
            _,
            ReconnectStatus::Retrying {
                attempt,
                max_attempts,
            },
        ) => format!(" (retry {attempt}/{max_attempts})"),
        (_, ReconnectStatus::Exhausted { attempts }) => {
            format!(" (gave up after {attempts} attempts)")
        }
    };
    let label = state.to_string();

    if !color {
        return format!("● {label}{detail}");
    }
    let dot = match state {
        ConnectionState::Connected => "●".green().to_string(),
        ConnectionState::Connecting => "●".yellow().to_string(),
        ConnectionState::Error => "●".red().to_string(),
        ConnectionState::Disconnected => "●".dimmed().to_string(),
    };
    format!("{dot} {label}{}", detail.dimmed())
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> MetricsSnapshot {
        MetricsSnapshot {
            vehicle_count: 3,
            avg_speed: 27.0,
            waiting: 1,
            sim_time: 118.0,
            signals: 1,
            avg_wait_time: 4.5,
            congestion_percent: 37.5,
        }
    }

    #[test]
    fn snapshot_line_without_color() {
        let line = render_snapshot(OutputFormat::Table, &sample(), false).unwrap();
        assert_eq!(
            line,
            "t 118.0s  vehicles 3  speed 27.0 km/h  waiting 1  wait 4.5s  signals 1  congestion 37.5%"
        );
    }

    #[test]
    fn compact_json_is_one_line() {
        let out = render_snapshot(OutputFormat::JsonCompact, &sample(), false).unwrap();
        assert!(!out.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["vehicle_count"], 3);
        assert_eq!(value["congestion_percent"], 37.5);
    }

    #[test]
    fn plain_is_tab_separated() {
        let out = render_snapshot(OutputFormat::Plain, &sample(), false).unwrap();
        assert_eq!(out.split('\t').count(), 7);
        assert!(out.starts_with("118\t3\t27\t"));
    }

    #[test]
    fn status_line_mentions_retry() {
        let line = status_line(
            ConnectionState::Error,
            ReconnectStatus::Retrying {
                attempt: 2,
                max_attempts: 5,
            },
            false,
        );
        assert_eq!(line, "● error (retry 2/5)");
        assert_eq!(
            status_line(ConnectionState::Connected, ReconnectStatus::Idle, false),
            "● connected"
        );
    }
}
