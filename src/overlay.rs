//! Fire overlay state: the loaded dataset plus everything derived from the
//! selected year. All transitions are synchronous and leave symbols, filter
//! and legend consistent with the current attribute.

use crate::controls::{FilterChoice, FilterController, SequenceController};
use crate::data::FireDataset;
use crate::symbols::{build_symbols, update_symbols, Legend, ProportionalSymbol};
use tracing::info;

pub struct Overlay {
    pub dataset: FireDataset,
    /// One symbol per feature, same order as `dataset.features`
    pub symbols: Vec<ProportionalSymbol>,
    sequence: SequenceController,
    filter: FilterController,
    legend: Option<Legend>,
    legend_enabled: bool,
    /// Symbol whose popup is open
    popup: Option<usize>,
}

impl Overlay {
    /// Initial display at the first year attribute
    pub fn new(dataset: FireDataset, legend_enabled: bool) -> Option<Self> {
        let sequence = SequenceController::new(dataset.attribute_count())?;
        let attribute = dataset.attribute(sequence.index()).to_string();
        let symbols = build_symbols(&dataset, &attribute);
        let filter = FilterController::new(dataset.features.len());
        let legend = legend_enabled.then(|| Legend::for_attribute(&dataset, &attribute));
        Some(Self {
            dataset,
            symbols,
            sequence,
            filter,
            legend,
            legend_enabled,
            popup: None,
        })
    }

    /// Year key currently displayed
    pub fn attribute(&self) -> &str {
        self.dataset.attribute(self.sequence.index())
    }

    pub fn index(&self) -> usize {
        self.sequence.index()
    }

    pub fn year_count(&self) -> usize {
        self.sequence.len()
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    pub fn filter(&self) -> &FilterController {
        &self.filter
    }

    pub fn step_forward(&mut self) {
        self.sequence.forward();
        self.on_index_changed();
    }

    pub fn step_backward(&mut self) {
        self.sequence.backward();
        self.on_index_changed();
    }

    pub fn select(&mut self, index: usize) {
        self.sequence.set_index(index);
        self.on_index_changed();
    }

    /// Clear the filter, re-render symbols, then rebuild the legend
    fn on_index_changed(&mut self) {
        self.filter.clear();
        let attribute = self.dataset.attribute(self.sequence.index()).to_string();
        update_symbols(&mut self.symbols, &self.dataset, &attribute);
        if self.legend_enabled {
            self.legend = Some(Legend::for_attribute(&self.dataset, &attribute));
        }
        if self.popup.is_some_and(|i| !self.symbols[i].is_drawable()) {
            self.popup = None;
        }
        info!(year = %attribute, index = self.sequence.index(), "selected year");
    }

    /// Apply a filter button against the current year
    pub fn apply_filter(&mut self, choice: FilterChoice) {
        match choice {
            FilterChoice::All => self.filter.clear(),
            FilterChoice::LargerThan(threshold) => {
                let attribute = self.attribute().to_string();
                self.filter.apply(threshold, &attribute, &self.dataset);
                if self.popup.is_some_and(|i| !self.filter.is_visible(self.symbols[i].feature)) {
                    self.popup = None;
                }
            }
        }
    }

    /// Whether a symbol should be drawn right now
    pub fn is_shown(&self, symbol: &ProportionalSymbol) -> bool {
        symbol.is_drawable() && self.filter.is_visible(symbol.feature)
    }

    /// Shown symbols with their indices
    pub fn shown_symbols(&self) -> impl Iterator<Item = (usize, &ProportionalSymbol)> {
        self.symbols.iter().enumerate().filter(|(_, s)| self.is_shown(s))
    }

    pub fn open_popup(&mut self, symbol: usize) {
        if self.symbols.get(symbol).is_some_and(|s| self.is_shown(s)) {
            self.popup = Some(symbol);
        }
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    /// Symbol with an open popup
    pub fn popup(&self) -> Option<&ProportionalSymbol> {
        self.popup.and_then(|i| self.symbols.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FireFeature;
    use crate::symbols::radius;
    use std::collections::HashMap;

    const YEARS: [&str; 9] = ["2010", "2011", "2012", "2013", "2014", "2015", "2016", "2017", "2018"];

    fn dataset() -> FireDataset {
        let feature = |name: &str, base: f64| FireFeature {
            identity: name.into(),
            lon: -120.0,
            lat: 38.0,
            outlines: Vec::new(),
            values_by_year: YEARS
                .iter()
                .enumerate()
                .map(|(i, y)| (y.to_string(), base * (i + 1) as f64))
                .collect::<HashMap<_, _>>(),
        };
        FireDataset {
            features: vec![feature("A", 80.0), feature("B", 120.0)],
            attributes: YEARS.iter().map(|y| y.to_string()).collect(),
        }
    }

    #[test]
    fn test_initial_state() {
        let overlay = Overlay::new(dataset(), true).unwrap();
        assert_eq!(overlay.index(), 0);
        assert_eq!(overlay.attribute(), "2010");
        assert_eq!(overlay.legend().unwrap().heading(), "Acres burned in 2010");
        assert_eq!(overlay.shown_symbols().count(), 2);
    }

    #[test]
    fn test_wraparound_updates_everything() {
        let mut overlay = Overlay::new(dataset(), true).unwrap();
        overlay.step_backward();
        assert_eq!(overlay.index(), 8);
        assert_eq!(overlay.attribute(), "2018");
        assert_eq!(overlay.symbols[0].radius, Some(radius(720.0)));
        assert_eq!(overlay.legend().unwrap().year, "2018");

        overlay.step_forward();
        assert_eq!(overlay.index(), 0);
        assert_eq!(overlay.symbols[1].radius, Some(radius(120.0)));
    }

    #[test]
    fn test_step_clears_filter() {
        let mut overlay = Overlay::new(dataset(), true).unwrap();
        overlay.select(4); // A = 400, B = 600
        overlay.apply_filter(FilterChoice::LargerThan(500.0));
        assert_eq!(overlay.shown_symbols().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);

        overlay.step_forward();
        assert_eq!(overlay.filter().threshold(), None);
        assert_eq!(overlay.shown_symbols().count(), 2);

        overlay.apply_filter(FilterChoice::LargerThan(10_000.0));
        overlay.select(2);
        assert_eq!(overlay.shown_symbols().count(), 2);
    }

    #[test]
    fn test_update_preserves_identity() {
        let mut overlay = Overlay::new(dataset(), false).unwrap();
        let before: Vec<(usize, f64, f64)> = overlay.symbols.iter().map(|s| (s.feature, s.lon, s.lat)).collect();
        overlay.select(6);
        let after: Vec<(usize, f64, f64)> = overlay.symbols.iter().map(|s| (s.feature, s.lon, s.lat)).collect();
        assert_eq!(before, after);
        assert_eq!(overlay.symbols[0].radius, Some(radius(560.0)));
        assert!(overlay.legend().is_none());
    }

    #[test]
    fn test_popup_follows_year_and_filter() {
        let mut overlay = Overlay::new(dataset(), true).unwrap();
        overlay.open_popup(0);
        overlay.step_forward();
        assert_eq!(
            overlay.popup().unwrap().popup.as_ref().unwrap().value_line,
            "Acres burned in 2011: 160"
        );

        overlay.apply_filter(FilterChoice::LargerThan(200.0));
        assert!(overlay.popup().is_none());

        // Hidden symbols cannot be activated
        overlay.open_popup(0);
        assert!(overlay.popup().is_none());
        overlay.apply_filter(FilterChoice::All);
        overlay.open_popup(0);
        overlay.close_popup();
        assert!(overlay.popup().is_none());
    }
}
