use crate::data::FireFeature;

/// Floor shown as the legend's smallest circle, regardless of the data
pub const LEGEND_MIN: f64 = 1000.0;

/// Granularity the legend maximum is rounded to
const ROUND_TO: f64 = 1000.0;

/// Legend circle values for one attribute
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegendValues {
    pub max: f64,
    pub mean: f64,
    pub min: f64,
}

/// Round half-up to the nearest multiple of 1000
pub fn round_thousand(value: f64) -> f64 {
    (value / ROUND_TO + 0.5).floor() * ROUND_TO
}

/// Legend values from a stream of attribute values.
///
/// `max` is the observed maximum rounded to the nearest 1000, `mean` is half of
/// that, and `min` is always [`LEGEND_MIN`]. Returns `None` when there are no values.
pub fn aggregate(values: impl IntoIterator<Item = f64>) -> Option<LegendValues> {
    let observed = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);

    if observed == f64::NEG_INFINITY {
        return None;
    }

    let max = round_thousand(observed);
    Some(LegendValues {
        max,
        mean: max / 2.0,
        min: LEGEND_MIN,
    })
}

/// Legend values for one attribute across a feature collection
pub fn legend_values(features: &[FireFeature], attribute: &str) -> Option<LegendValues> {
    aggregate(features.iter().filter_map(|f| f.value(attribute)))
}
