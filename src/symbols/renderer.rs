use crate::data::FireDataset;
use crate::symbols::radius::radius_for;
use ratatui::style::Color;
use tracing::debug;

/// Fixed visual style shared by every proportional symbol
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SymbolStyle {
    pub fill: Color,
    pub stroke: Color,
    pub weight: u8,
    pub opacity: f32,
    pub fill_opacity: f32,
}

/// Crimson fill, black 1px stroke
pub const SYMBOL_STYLE: SymbolStyle = SymbolStyle {
    fill: Color::Rgb(0xDC, 0x14, 0x3C),
    stroke: Color::Rgb(0x00, 0x00, 0x00),
    weight: 1,
    opacity: 1.0,
    fill_opacity: 0.8,
};

/// Text revealed when a symbol is activated
#[derive(Clone, Debug, PartialEq)]
pub struct Popup {
    /// e.g. "County: Lake"
    pub identity_line: String,
    /// e.g. "Acres burned in 2015: 1234"
    pub value_line: String,
}

impl Popup {
    pub fn new(identity: &str, attribute: &str, value: f64) -> Self {
        Self {
            identity_line: format!("County: {identity}"),
            value_line: format!("Acres burned in {attribute}: {}", format_acres(value)),
        }
    }

    /// Single-line form of the popup
    pub fn text(&self) -> String {
        format!("{} — {}", self.identity_line, self.value_line)
    }
}

/// A circle marker bound to one feature of the dataset
#[derive(Clone, Debug)]
pub struct ProportionalSymbol {
    /// Index into `FireDataset::features`; fixed for the symbol's lifetime
    pub feature: usize,
    pub lon: f64,
    pub lat: f64,
    /// `None` when the feature has no value for the current attribute
    pub radius: Option<f64>,
    pub popup: Option<Popup>,
    pub style: SymbolStyle,
}

impl ProportionalSymbol {
    /// Whether there is anything to draw for the current attribute
    pub fn is_drawable(&self) -> bool {
        self.radius.is_some()
    }
}

/// Build one symbol per feature for an attribute
pub fn build_symbols(dataset: &FireDataset, attribute: &str) -> Vec<ProportionalSymbol> {
    let mut symbols: Vec<ProportionalSymbol> = dataset
        .features
        .iter()
        .enumerate()
        .map(|(idx, f)| ProportionalSymbol {
            feature: idx,
            lon: f.lon,
            lat: f.lat,
            radius: None,
            popup: None,
            style: SYMBOL_STYLE,
        })
        .collect();
    update_symbols(&mut symbols, dataset, attribute);
    symbols
}

/// Re-point existing symbols at a new attribute, in place.
/// Symbol count, order and identity are preserved.
pub fn update_symbols(symbols: &mut [ProportionalSymbol], dataset: &FireDataset, attribute: &str) {
    let mut skipped = 0usize;
    for symbol in symbols.iter_mut() {
        let Some(feature) = dataset.features.get(symbol.feature) else {
            continue;
        };
        let value = feature.value(attribute);
        symbol.radius = radius_for(value);
        symbol.popup = match (value, symbol.radius) {
            (Some(v), Some(_)) => Some(Popup::new(&feature.identity, attribute, v)),
            _ => {
                skipped += 1;
                None
            }
        };
    }
    debug!(attribute, skipped, "updated proportional symbols");
}

/// Acre counts print without a trailing `.0` when they are whole
pub fn format_acres(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
