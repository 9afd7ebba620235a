use crate::config::Config;
use crate::controls::FilterChoice;
use crate::data::{self, DataSource, FireDataset};
use crate::error::LoadError;
use crate::map::{MapRenderer, Viewport};
use crate::overlay::Overlay;
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::{info, warn};

/// Something a control or key asked for. Input handlers only translate
/// events into actions; `App::dispatch` is the one place state changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    StepForward,
    StepBackward,
    SelectYear(usize),
    FirstYear,
    LastYear,
    Filter(FilterChoice),
    /// Filter button by position, "Display all" is slot 0
    FilterSlot(usize),
    ClosePopup,
    ToggleBasemap,
    TogglePerimeters,
    ToggleSymbols,
    ResetView,
    Quit,
}

/// Progress of the one-shot data load
pub enum DataState {
    Loading(Receiver<Result<FireDataset, LoadError>>),
    Ready(Overlay),
    Unavailable(String),
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    /// Initial view, restored by `ResetView`
    home: Viewport,
    pub map_renderer: MapRenderer,
    pub data: DataState,
    pub source: DataSource,
    pub filters: Vec<FilterChoice>,
    legend_enabled: bool,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
}

impl App {
    /// `width` x `height` is the map canvas in braille pixels
    pub fn new(config: &Config, data: DataState, width: usize, height: usize) -> Self {
        let viewport = Viewport::new(config.center_lon, config.center_lat, config.zoom, width, height);
        let mut map_renderer = MapRenderer::new();
        map_renderer.settings.symbol_scale = config.symbol_scale;
        Self {
            home: viewport.clone(),
            viewport,
            map_renderer,
            data,
            source: config.source.clone(),
            filters: config.filters.clone(),
            legend_enabled: config.legend,
            should_quit: false,
            last_mouse: None,
        }
    }

    /// Start loading the dataset in the background
    pub fn start_load(config: &Config) -> DataState {
        DataState::Loading(data::spawn_load(config.source.clone(), config.identity_field.clone()))
    }

    /// Pick up the load result if it has arrived. Returns true when the state changed.
    pub fn poll_data(&mut self) -> bool {
        let DataState::Loading(rx) = &self.data else {
            return false;
        };
        let next = match rx.try_recv() {
            Ok(Ok(dataset)) => match Overlay::new(dataset, self.legend_enabled) {
                Some(overlay) => DataState::Ready(overlay),
                None => DataState::Unavailable(LoadError::NoYearAttributes.to_string()),
            },
            Ok(Err(e)) => DataState::Unavailable(e.to_string()),
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                DataState::Unavailable("loader stopped without a result".to_string())
            }
        };
        if let DataState::Ready(overlay) = &next {
            info!(years = overlay.year_count(), "fire overlay ready");
        }
        self.data = next;
        true
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        match &self.data {
            DataState::Ready(overlay) => Some(overlay),
            _ => None,
        }
    }

    fn overlay_mut(&mut self) -> Option<&mut Overlay> {
        match &mut self.data {
            DataState::Ready(overlay) => Some(overlay),
            _ => None,
        }
    }

    /// Apply an action. Year and filter actions are ignored until data is ready.
    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::ResetView => {
                let (width, height) = (self.viewport.width, self.viewport.height);
                self.viewport = self.home.clone();
                self.viewport.resize(width, height);
            }
            Action::ToggleBasemap => self.map_renderer.toggle_basemap(),
            Action::TogglePerimeters => self.map_renderer.toggle_perimeters(),
            Action::ToggleSymbols => self.map_renderer.toggle_symbols(),
            Action::FilterSlot(slot) => match self.filters.get(slot).copied() {
                Some(choice) => self.dispatch(Action::Filter(choice)),
                None => warn!(slot, "no filter button in this slot"),
            },
            _ => {
                let Some(overlay) = self.overlay_mut() else {
                    return;
                };
                match action {
                    Action::StepForward => overlay.step_forward(),
                    Action::StepBackward => overlay.step_backward(),
                    Action::SelectYear(index) => overlay.select(index),
                    Action::FirstYear => overlay.select(0),
                    Action::LastYear => {
                        let last = overlay.year_count() - 1;
                        overlay.select(last);
                    }
                    Action::Filter(choice) => overlay.apply_filter(choice),
                    Action::ClosePopup => overlay.close_popup(),
                    _ => {}
                }
            }
        }
    }

    /// Update viewport size when the map area changes (braille pixels)
    pub fn resize(&mut self, width: usize, height: usize) {
        self.viewport.resize(width, height);
        self.home.resize(width, height);
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a map pixel
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a map pixel
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.viewport.zoom_out_at(px, py);
    }

    /// Left click on the map: open the popup of the symbol under the cursor,
    /// otherwise close any popup and start a drag
    pub fn click_map(&mut self, px: i32, py: i32, col: u16, row: u16) {
        let hit = self
            .overlay()
            .and_then(|o| self.map_renderer.symbol_at(o, &self.viewport, px, py));
        if let Some(overlay) = self.overlay_mut() {
            match hit {
                Some(idx) => {
                    overlay.open_popup(idx);
                    if let Some(popup) = overlay.popup().and_then(|s| s.popup.as_ref()) {
                        info!("opened popup: {}", popup.text());
                    }
                }
                None => overlay.close_popup(),
            }
        }
        if hit.is_none() {
            self.last_mouse = Some((col, row));
        }
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            // Terminal cells to braille pixels
            self.pan(dx * 2, dy * 4);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.2}°{}, {:.2}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use crate::data::FireFeature;
    use clap::Parser;
    use std::collections::HashMap;
    use std::sync::mpsc;

    fn config() -> Config {
        Cli::parse_from(["fire-map"]).into_config().unwrap()
    }

    fn dataset() -> FireDataset {
        let feature = |name: &str, lon: f64, a: f64, b: f64| FireFeature {
            identity: name.into(),
            lon,
            lat: 37.9,
            outlines: Vec::new(),
            values_by_year: HashMap::from([("2015".to_string(), a), ("2016".to_string(), b)]),
        };
        FireDataset {
            features: vec![
                feature("A", -121.422, 400.0, 50_000.0),
                feature("B", -120.0, 600.0, 10.0),
            ],
            attributes: vec!["2015".into(), "2016".into()],
        }
    }

    fn ready_app() -> App {
        let config = config();
        let overlay = Overlay::new(dataset(), config.legend).unwrap();
        App::new(&config, DataState::Ready(overlay), 160, 120)
    }

    #[test]
    fn test_poll_data_ready() {
        let (tx, rx) = mpsc::channel();
        let mut app = App::new(&config(), DataState::Loading(rx), 160, 120);
        assert!(!app.poll_data());
        tx.send(Ok(dataset())).unwrap();
        assert!(app.poll_data());
        assert_eq!(app.overlay().unwrap().attribute(), "2015");
        assert!(!app.poll_data());
    }

    #[test]
    fn test_poll_data_failure_is_visible() {
        let (tx, rx) = mpsc::channel();
        let mut app = App::new(&config(), DataState::Loading(rx), 160, 120);
        tx.send(Err(LoadError::Empty)).unwrap();
        assert!(app.poll_data());
        assert!(matches!(&app.data, DataState::Unavailable(msg) if msg.contains("no features")));

        let (tx, rx) = mpsc::channel::<Result<FireDataset, LoadError>>();
        drop(tx);
        let mut app = App::new(&config(), DataState::Loading(rx), 160, 120);
        assert!(app.poll_data());
        assert!(matches!(app.data, DataState::Unavailable(_)));
        // Year actions are inert without data
        app.dispatch(Action::StepForward);
        assert!(app.overlay().is_none());
    }

    #[test]
    fn test_dispatch_filter_then_step() {
        let mut app = ready_app();
        app.dispatch(Action::FilterSlot(2)); // > 500
        assert_eq!(app.overlay().unwrap().filter().visible_count(), 1);
        app.dispatch(Action::StepForward);
        let overlay = app.overlay().unwrap();
        assert_eq!(overlay.attribute(), "2016");
        assert_eq!(overlay.filter().visible_count(), 2);

        app.dispatch(Action::FilterSlot(99));
        app.dispatch(Action::LastYear);
        assert_eq!(app.overlay().unwrap().index(), 1);
        app.dispatch(Action::FirstYear);
        assert_eq!(app.overlay().unwrap().index(), 0);
        app.dispatch(Action::SelectYear(1));
        assert_eq!(app.overlay().unwrap().index(), 1);
    }

    #[test]
    fn test_click_opens_popup() {
        let mut app = ready_app();
        let (px, py) = app.viewport.project(-121.422, 37.9);
        app.click_map(px, py, 0, 0);
        let popup = app.overlay().unwrap().popup().unwrap().popup.clone().unwrap();
        assert_eq!(popup.text(), "County: A — Acres burned in 2015: 400");
        assert!(app.last_mouse.is_none());

        app.click_map(0, 0, 3, 4);
        assert!(app.overlay().unwrap().popup().is_none());
        assert_eq!(app.last_mouse, Some((3, 4)));
    }

    #[test]
    fn test_reset_view_keeps_size() {
        let mut app = ready_app();
        app.pan(40, 10);
        app.zoom_in();
        app.resize(200, 100);
        app.dispatch(Action::ResetView);
        assert_eq!(app.viewport.zoom, 24.0);
        assert_eq!(app.viewport.width, 200);
        assert_eq!(app.viewport.center_lon, -121.422);
    }

    #[test]
    fn test_quit_and_toggles() {
        let mut app = ready_app();
        app.dispatch(Action::TogglePerimeters);
        assert!(!app.map_renderer.settings.show_perimeters);
        app.dispatch(Action::ToggleSymbols);
        assert!(!app.map_renderer.settings.show_symbols);
        app.dispatch(Action::Quit);
        assert!(app.should_quit);
    }
}
