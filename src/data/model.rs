use std::collections::HashMap;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// One fire record: where it is, what it is called, and acres burned per year
#[derive(Clone, Debug)]
pub struct FireFeature {
    /// Identity field, e.g. the county name
    pub identity: String,
    /// Anchor for the proportional symbol
    pub lon: f64,
    pub lat: f64,
    /// Perimeter rings or lines, empty for point features
    pub outlines: Vec<LineString>,
    /// Acres burned keyed by year attribute. Missing or non-numeric values are absent.
    pub values_by_year: HashMap<String, f64>,
}

impl FireFeature {
    /// Value for a year attribute, `None` when the feature has no usable value
    pub fn value(&self, attribute: &str) -> Option<f64> {
        self.values_by_year.get(attribute).copied()
    }
}

/// The loaded feature collection plus its ordered year attributes
#[derive(Clone, Debug)]
pub struct FireDataset {
    pub features: Vec<FireFeature>,
    /// Year keys in source order. Never empty.
    pub attributes: Vec<String>,
}

impl FireDataset {
    /// Number of year attributes
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Year key at a sequence index
    pub fn attribute(&self, index: usize) -> &str {
        &self.attributes[index.min(self.attributes.len().saturating_sub(1))]
    }
}

/// True when a property key names a year, i.e. contains a run of four ASCII digits
pub fn is_year_key(key: &str) -> bool {
    key.as_bytes()
        .windows(4)
        .any(|w| w.iter().all(u8::is_ascii_digit))
}

/// Coerce a raw property to acres. Numbers pass through, numeric strings are parsed,
/// anything else (or a non-finite result) is treated as missing.
pub fn coerce_value(raw: &serde_json::Value) -> Option<f64> {
    let v = match raw {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Mean of a set of points
pub fn point_mean(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    Some((sx / n, sy / n))
}

/// Mean of a ring's vertices, ignoring the closing vertex when it repeats the first
pub fn ring_center(ring: &[(f64, f64)]) -> Option<(f64, f64)> {
    let pts = match ring {
        [first, .., last] if first == last && ring.len() > 1 => &ring[..ring.len() - 1],
        _ => ring,
    };
    point_mean(pts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_year_keys() {
        assert!(is_year_key("2015"));
        assert!(is_year_key("acres_2019"));
        assert!(is_year_key("Y2020_burn"));
        assert!(!is_year_key("COUNTY"));
        assert!(!is_year_key("FIPS_06"));
        assert!(!is_year_key("20"));
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value(&json!(1234)), Some(1234.0));
        assert_eq!(coerce_value(&json!(12.5)), Some(12.5));
        assert_eq!(coerce_value(&json!(" 900 ")), Some(900.0));
        assert_eq!(coerce_value(&json!("n/a")), None);
        assert_eq!(coerce_value(&json!(null)), None);
        assert_eq!(coerce_value(&json!(true)), None);
        assert_eq!(coerce_value(&json!("NaN")), None);
    }

    #[test]
    fn test_ring_center_closed_ring() {
        let ring = vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)];
        assert_eq!(ring_center(&ring), Some((1.0, 1.0)));
        assert_eq!(ring_center(&[]), None);
    }

    #[test]
    fn test_point_mean_keeps_repeated_points() {
        let points = [(0.0, 0.0), (3.0, 0.0), (0.0, 0.0)];
        assert_eq!(point_mean(&points), Some((1.0, 0.0)));
        assert_eq!(ring_center(&points), Some((1.5, 0.0)));
        assert_eq!(point_mean(&[]), None);
    }

    #[test]
    fn test_attribute_lookup_clamps() {
        let mut with = HashMap::new();
        with.insert("2015".to_string(), 400.0);
        let dataset = FireDataset {
            features: vec![
                FireFeature {
                    identity: "A".into(),
                    lon: 0.0,
                    lat: 0.0,
                    outlines: Vec::new(),
                    values_by_year: with,
                },
                FireFeature {
                    identity: "B".into(),
                    lon: 0.0,
                    lat: 0.0,
                    outlines: Vec::new(),
                    values_by_year: HashMap::new(),
                },
            ],
            attributes: vec!["2015".into()],
        };
        assert_eq!(dataset.features[0].value("2015"), Some(400.0));
        assert_eq!(dataset.features[1].value("2015"), None);
        assert_eq!(dataset.attribute(7), "2015");
    }
}
