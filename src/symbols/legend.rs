use crate::data::FireDataset;
use crate::symbols::aggregate::{legend_values, LegendValues};
use crate::symbols::radius::radius;
use crate::symbols::renderer::format_acres;

/// Which legend circle an entry describes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegendKey {
    Max,
    Mean,
    Min,
}

impl LegendKey {
    pub fn label(self) -> &'static str {
        match self {
            LegendKey::Max => "max",
            LegendKey::Mean => "mean",
            LegendKey::Min => "min",
        }
    }
}

/// One labelled circle of the legend
#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub key: LegendKey,
    pub value: f64,
    pub radius: f64,
}

impl LegendEntry {
    pub fn text(&self) -> String {
        format!("{} acres", format_acres(self.value))
    }
}

/// Legend for the currently selected year
#[derive(Clone, Debug, PartialEq)]
pub struct Legend {
    pub year: String,
    /// `None` when no feature has a value for `year`
    pub values: Option<LegendValues>,
}

impl Legend {
    /// Recompute the legend for an attribute
    pub fn for_attribute(dataset: &FireDataset, attribute: &str) -> Self {
        Self {
            year: attribute.to_string(),
            values: legend_values(&dataset.features, attribute),
        }
    }

    pub fn heading(&self) -> String {
        format!("Acres burned in {}", self.year)
    }

    /// Circles largest first. Empty when there is no data.
    pub fn entries(&self) -> Vec<LegendEntry> {
        let Some(v) = self.values else {
            return Vec::new();
        };
        [
            (LegendKey::Max, v.max),
            (LegendKey::Mean, v.mean),
            (LegendKey::Min, v.min),
        ]
        .into_iter()
        .map(|(key, value)| LegendEntry {
            key,
            value,
            radius: radius(value),
        })
        .collect()
    }
}
