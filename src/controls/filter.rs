use crate::data::FireDataset;
use tracing::debug;

/// A filter button: show everything, or only fires larger than a threshold
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterChoice {
    All,
    LargerThan(f64),
}

impl FilterChoice {
    pub fn label(&self) -> String {
        match self {
            FilterChoice::All => "Display all".to_string(),
            FilterChoice::LargerThan(t) => format!(">{}", crate::symbols::format_acres(*t)),
        }
    }
}

/// Per-feature visibility driven by an acreage threshold
#[derive(Clone, Debug)]
pub struct FilterController {
    visible: Vec<bool>,
    threshold: Option<f64>,
}

impl FilterController {
    /// Everything shown
    pub fn new(feature_count: usize) -> Self {
        Self {
            visible: vec![true; feature_count],
            threshold: None,
        }
    }

    /// Hide every feature whose value for `attribute` is at or below `threshold`.
    /// Features without a value are left shown.
    pub fn apply(&mut self, threshold: f64, attribute: &str, dataset: &FireDataset) {
        for (shown, feature) in self.visible.iter_mut().zip(&dataset.features) {
            let hide = feature.value(attribute).is_some_and(|v| v <= threshold);
            if hide {
                debug!("hiding {} for year {}", feature.identity, attribute);
            }
            *shown = !hide;
        }
        self.threshold = Some(threshold);
    }

    /// Show every feature again
    pub fn clear(&mut self) {
        debug!("clearing filter");
        self.visible.fill(true);
        self.threshold = None;
    }

    pub fn is_visible(&self, feature: usize) -> bool {
        self.visible.get(feature).copied().unwrap_or(true)
    }

    /// Active threshold, if any
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// The button that corresponds to the current state
    pub fn active_choice(&self) -> FilterChoice {
        self.threshold.map_or(FilterChoice::All, FilterChoice::LargerThan)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|v| **v).count()
    }
}
