mod aggregate;
mod legend;
mod radius;
mod renderer;

pub use aggregate::{aggregate, legend_values, round_thousand, LegendValues, LEGEND_MIN};
pub use legend::{Legend, LegendEntry, LegendKey};
pub use radius::{radius, radius_for, SCALE_FACTOR};
pub use renderer::{
    build_symbols, format_acres, update_symbols, Popup, ProportionalSymbol, SymbolStyle,
    SYMBOL_STYLE,
};
