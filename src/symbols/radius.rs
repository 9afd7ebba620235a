use std::f64::consts::PI;

/// Acres per unit of symbol area
pub const SCALE_FACTOR: f64 = 30.0;

/// Radius of a proportional symbol whose area encodes `value`.
///
/// NaN in gives NaN out; callers treat a non-finite radius as "don't draw".
/// Negative values are not valid acreage and must not be passed.
#[inline]
pub fn radius(value: f64) -> f64 {
    let area = value / SCALE_FACTOR;
    (area / PI).sqrt()
}

/// Radius for a value that may be missing. `None` when nothing finite can be drawn.
pub fn radius_for(value: Option<f64>) -> Option<f64> {
    value.map(radius).filter(|r| r.is_finite())
}
