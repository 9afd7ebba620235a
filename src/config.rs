use crate::controls::FilterChoice;
use crate::data::DataSource;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

/// Largest accepted `--symbol-scale`
pub const MAX_SYMBOL_SCALE: f64 = 10.0;

/// Command line for the fire map
#[derive(Parser, Debug)]
#[command(
    name = "fire-map",
    version,
    about = "Wildfire acres burned per year as proportional symbols on a terminal map"
)]
pub struct Cli {
    /// GeoJSON feature collection: a file path or an http(s) URL
    #[arg(long, env = "FIRE_MAP_DATA", default_value = "data/firedata.geojson")]
    pub data: String,

    /// Property naming each feature in popups
    #[arg(long, default_value = "COUNTY")]
    pub identity_field: String,

    /// Hide the legend panel
    #[arg(long, default_value_t = false)]
    pub no_legend: bool,

    /// Optional GeoJSON line layer drawn under the fires (e.g. state outlines)
    #[arg(long)]
    pub basemap: Option<PathBuf>,

    /// Initial map center as LAT,LON
    #[arg(long, default_value = "37.9,-121.422", value_parser = parse_center)]
    pub center: (f64, f64),

    /// Initial zoom (1 = whole world across the screen)
    #[arg(long, default_value_t = 24.0)]
    pub zoom: f64,

    /// Braille dots per unit of symbol radius (at most 10)
    #[arg(long, default_value_t = 0.5)]
    pub symbol_scale: f64,

    /// Acreage thresholds for the filter buttons, ascending
    #[arg(long, value_delimiter = ',', default_values_t = [100.0, 500.0, 1000.0, 5000.0])]
    pub thresholds: Vec<f64>,

    /// Write logs to this file (filter with RUST_LOG)
    #[arg(long, env = "FIRE_MAP_LOG")]
    pub log_file: Option<PathBuf>,
}

/// Validated runtime configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub source: DataSource,
    pub identity_field: String,
    pub legend: bool,
    pub basemap: Option<PathBuf>,
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    pub symbol_scale: f64,
    /// "Display all" first, then one button per threshold
    pub filters: Vec<FilterChoice>,
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Cross-field checks clap cannot express; failures are reported as clap usage errors
    pub fn into_config(self) -> Result<Config, clap::Error> {
        let invalid = |msg: String| Cli::command().error(ErrorKind::ValueValidation, msg);

        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(invalid(format!("--zoom must be a positive number, got {}", self.zoom)));
        }
        if !(self.symbol_scale.is_finite() && self.symbol_scale > 0.0 && self.symbol_scale <= MAX_SYMBOL_SCALE) {
            return Err(invalid(format!(
                "--symbol-scale must be in (0, {MAX_SYMBOL_SCALE}], got {}",
                self.symbol_scale
            )));
        }
        if self.thresholds.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(invalid("--thresholds must be non-negative numbers".to_string()));
        }
        if self.thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("--thresholds must be strictly ascending".to_string()));
        }

        let (center_lat, center_lon) = self.center;
        let filters = std::iter::once(FilterChoice::All)
            .chain(self.thresholds.into_iter().map(FilterChoice::LargerThan))
            .collect();

        Ok(Config {
            source: DataSource::parse(&self.data),
            identity_field: self.identity_field,
            legend: !self.no_legend,
            basemap: self.basemap,
            center_lat,
            center_lon,
            zoom: self.zoom,
            symbol_scale: self.symbol_scale,
            filters,
            log_file: self.log_file,
        })
    }
}

/// Parse "LAT,LON"
fn parse_center(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{s}'"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("center out of range: {lat},{lon}"));
    }
    Ok((lat, lon))
}
