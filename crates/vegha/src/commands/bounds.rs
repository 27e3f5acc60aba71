//! `vegha bounds`: network extent of the running simulation.

use serde::Serialize;
use tabled::Tabled;

use vegha_core::{BackendConfig, CoreError, NetworkBounds};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Corner {
    corner: &'static str,
    lat: f64,
    lon: f64,
}

#[derive(Tabled)]
struct CornerRow {
    #[tabled(rename = "Corner")]
    corner: &'static str,
    #[tabled(rename = "Latitude")]
    lat: String,
    #[tabled(rename = "Longitude")]
    lon: String,
}

fn corners(bounds: &NetworkBounds) -> [Corner; 3] {
    let corner = |corner, [lat, lon]: [f64; 2]| Corner { corner, lat, lon };
    [
        corner("southwest", bounds.southwest),
        corner("northeast", bounds.northeast),
        corner("center", bounds.center),
    ]
}

fn render(format: OutputFormat, bounds: &NetworkBounds) -> Result<String, CliError> {
    match format {
        // Structured formats keep the backend's shape.
        OutputFormat::Json => Ok(serde_json::to_string_pretty(bounds)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(bounds)?),
        OutputFormat::Yaml => output::render_yaml(bounds),
        OutputFormat::Table | OutputFormat::Plain => output::render_list(
            format,
            &corners(bounds),
            |c| CornerRow {
                corner: c.corner,
                lat: format!("{:.6}", c.lat),
                lon: format!("{:.6}", c.lon),
            },
            |c| format!("{}\t{}\t{}", c.corner, c.lat, c.lon),
        ),
    }
}

pub async fn handle(backend: &BackendConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let client = backend.http_client()?;
    let bounds = client.bounds().await.map_err(CoreError::from)?;

    let rendered = render(global.output, &bounds)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BOUNDS: NetworkBounds = NetworkBounds {
        southwest: [18.51, 73.84],
        northeast: [18.53, 73.86],
        center: [18.52, 73.85],
    };

    #[test]
    fn plain_lists_three_corners() {
        let out = render(OutputFormat::Plain, &BOUNDS).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "southwest\t18.51\t73.84");
        assert!(lines[2].starts_with("center\t"));
    }

    #[test]
    fn json_keeps_backend_shape() {
        let out = render(OutputFormat::JsonCompact, &BOUNDS).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["center"][1], 73.85);
    }
}
