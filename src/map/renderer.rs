use crate::braille::BrailleCanvas;
use crate::data::LineString;
use crate::map::geometry::{draw_circle, draw_line, draw_ring};
use crate::map::projection::Viewport;
use crate::overlay::Overlay;

/// Largest symbol radius in braille dots
pub const MAX_PIXEL_RADIUS: i32 = 1024;

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_basemap: bool,
    pub show_perimeters: bool,
    pub show_symbols: bool,
    /// Braille dots per unit of symbol radius
    pub symbol_scale: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_basemap: true,
            show_perimeters: true,
            show_symbols: true,
            symbol_scale: 0.5,
        }
    }
}

/// Rendered map layers, back to front
pub struct MapLayers {
    pub basemap: BrailleCanvas,
    pub perimeters: BrailleCanvas,
    pub symbols: BrailleCanvas,
    /// Ring around the symbol with an open popup
    pub highlight: BrailleCanvas,
}

/// Map renderer: a static basemap under the fire overlay
pub struct MapRenderer {
    pub basemap: Vec<LineString>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            basemap: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    /// Symbol radius in braille dots; anything drawable is at least one dot
    pub fn pixel_radius(&self, radius: f64) -> i32 {
        let r = (radius * self.settings.symbol_scale).round();
        r.clamp(1.0, MAX_PIXEL_RADIUS as f64) as i32
    }

    /// Render every layer for a canvas of `width` x `height` characters
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        overlay: Option<&Overlay>,
    ) -> MapLayers {
        let mut layers = MapLayers {
            basemap: BrailleCanvas::new(width, height),
            perimeters: BrailleCanvas::new(width, height),
            symbols: BrailleCanvas::new(width, height),
            highlight: BrailleCanvas::new(width, height),
        };

        if self.settings.show_basemap {
            for line in &self.basemap {
                draw_linestring(&mut layers.basemap, line, viewport);
            }
        }

        let Some(overlay) = overlay else {
            return layers;
        };

        if self.settings.show_perimeters {
            for (_, symbol) in overlay.shown_symbols() {
                for line in &overlay.dataset.features[symbol.feature].outlines {
                    draw_linestring(&mut layers.perimeters, line, viewport);
                }
            }
        }

        if self.settings.show_symbols {
            for (_, symbol) in overlay.shown_symbols() {
                let Some(radius) = symbol.radius else { continue };
                let r = self.pixel_radius(radius);
                let (px, py) = viewport.project(symbol.lon, symbol.lat);
                if !viewport.is_visible(px, py, r) {
                    continue;
                }
                draw_circle(&mut layers.symbols, px, py, r);
            }
        }

        if let Some(symbol) = overlay.popup() {
            if let Some(radius) = symbol.radius {
                let (px, py) = viewport.project(symbol.lon, symbol.lat);
                draw_ring(&mut layers.highlight, px, py, self.pixel_radius(radius) + 1);
            }
        }

        layers
    }

    /// Topmost shown symbol containing the pixel, preferring the smallest
    pub fn symbol_at(&self, overlay: &Overlay, viewport: &Viewport, px: i32, py: i32) -> Option<usize> {
        overlay
            .shown_symbols()
            .filter_map(|(idx, symbol)| {
                let r = self.pixel_radius(symbol.radius?);
                let (sx, sy) = viewport.project(symbol.lon, symbol.lat);
                let (dx, dy) = ((sx - px) as i64, (sy - py) as i64);
                // One dot of slack so tiny symbols stay clickable
                let reach = (r + 1) as i64;
                (dx * dx + dy * dy <= reach * reach).then_some((idx, r))
            })
            .min_by_key(|&(_, r)| r)
            .map(|(idx, _)| idx)
    }

    /// Add a basemap line
    pub fn add_basemap_line(&mut self, line: LineString) {
        if line.len() >= 2 {
            self.basemap.push(line);
        }
    }

    pub fn toggle_basemap(&mut self) {
        self.settings.show_basemap = !self.settings.show_basemap;
    }

    pub fn toggle_perimeters(&mut self) {
        self.settings.show_perimeters = !self.settings.show_perimeters;
    }

    pub fn toggle_symbols(&mut self) {
        self.settings.show_symbols = !self.settings.show_symbols;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;
    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);
        if let Some((prev_x, prev_y)) = prev {
            // Skip segments that wrap across the antimeridian
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }
        prev = Some((px, py));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FireDataset, FireFeature};
    use std::collections::HashMap;

    fn overlay() -> Overlay {
        let feature = |name: &str, lon: f64, acres: f64| FireFeature {
            identity: name.into(),
            lon,
            lat: 38.0,
            outlines: vec![vec![(lon - 0.2, 37.8), (lon + 0.2, 37.8), (lon, 38.2), (lon - 0.2, 37.8)]],
            values_by_year: HashMap::from([("2015".to_string(), acres)]),
        };
        let dataset = FireDataset {
            features: vec![feature("Big", -120.0, 90_000.0), feature("Small", -118.0, 900.0)],
            attributes: vec!["2015".into()],
        };
        Overlay::new(dataset, true).unwrap()
    }

    fn viewport() -> Viewport {
        // 40x20 chars = 80x80 dots
        Viewport::new(-119.5, 38.0, 60.0, 80, 80)
    }

    #[test]
    fn test_symbols_drawn_at_projected_center() {
        let renderer = MapRenderer::new();
        let overlay = overlay();
        let vp = viewport();
        let layers = renderer.render(40, 20, &vp, Some(&overlay));
        let (px, py) = vp.project(-120.0, 38.0);
        assert!(layers.symbols.is_set(px as usize, py as usize));
        assert!(layers.perimeters.rows().any(|r| r.chars().any(|c| c != '\u{2800}')));
    }

    #[test]
    fn test_hidden_symbols_not_drawn() {
        let renderer = MapRenderer::new();
        let mut overlay = overlay();
        overlay.apply_filter(crate::controls::FilterChoice::LargerThan(1000.0));
        let vp = viewport();
        let layers = renderer.render(40, 20, &vp, Some(&overlay));
        let (px, py) = vp.project(-118.0, 38.0);
        assert!(!layers.symbols.is_set(px as usize, py as usize));
    }

    #[test]
    fn test_symbol_hit_testing() {
        let renderer = MapRenderer::new();
        let overlay = overlay();
        let vp = viewport();
        let (px, py) = vp.project(-118.0, 38.0);
        assert_eq!(renderer.symbol_at(&overlay, &vp, px, py), Some(1));
        let (bx, by) = vp.project(-120.0, 38.0);
        assert_eq!(renderer.symbol_at(&overlay, &vp, bx, by), Some(0));
        assert_eq!(renderer.symbol_at(&overlay, &vp, 0, 79), None);
    }

    #[test]
    fn test_symbols_layer_toggle() {
        let mut renderer = MapRenderer::new();
        renderer.toggle_symbols();
        let overlay = overlay();
        let vp = viewport();
        let layers = renderer.render(40, 20, &vp, Some(&overlay));
        let (px, py) = vp.project(-120.0, 38.0);
        assert!(!layers.symbols.is_set(px as usize, py as usize));
        assert!(layers.perimeters.rows().any(|r| r.chars().any(|c| c != '\u{2800}')));
    }

    #[test]
    fn test_pixel_radius_bounded() {
        let mut renderer = MapRenderer::new();
        assert_eq!(renderer.pixel_radius(0.1), 1);
        assert_eq!(renderer.pixel_radius(10.0), 5);
        renderer.settings.symbol_scale = 40.0;
        assert_eq!(renderer.pixel_radius(1e9), MAX_PIXEL_RADIUS);
    }

    #[test]
    fn test_large_symbols_fill_canvas() {
        let mut renderer = MapRenderer::new();
        renderer.settings.symbol_scale = 40.0;
        let overlay = overlay();
        let layers = renderer.render(40, 20, &viewport(), Some(&overlay));
        assert!(layers.symbols.is_set(0, 0));
        assert!(layers.symbols.is_set(79, 79));
    }

    #[test]
    fn test_no_overlay_only_basemap() {
        let mut renderer = MapRenderer::new();
        renderer.add_basemap_line(vec![(-121.0, 38.0), (-118.0, 38.0)]);
        renderer.add_basemap_line(vec![(0.0, 0.0)]);
        assert_eq!(renderer.basemap.len(), 1);
        let layers = renderer.render(40, 20, &viewport(), None);
        assert!(layers.basemap.rows().any(|r| r.chars().any(|c| c != '\u{2800}')));
        assert!(layers.symbols.rows().all(|r| r.chars().all(|c| c == '\u{2800}')));
    }
}
