use crate::app::{Action, App, DataState};
use crate::braille::{BrailleCanvas, BLANK};
use crate::controls::FilterChoice;
use crate::map::{draw_ring, MapLayers, MapRenderer};
use crate::symbols::{Legend, LegendEntry, Popup, SYMBOL_STYLE};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

const FILTER_PREFIX: &str = " Filter: ";
const PERIMETER_COLOR: Color = Color::Rgb(0xFF, 0x78, 0x00);

/// Where a mouse press landed
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Hit {
    /// A control button or slider cell
    Action(Action),
    /// A control's frame: swallow the event so the map doesn't pan
    Control,
    /// The map canvas, in braille pixels relative to its top-left
    Map(i32, i32),
    None,
}

/// Sequence control geometry: `◀ ───●─── ▶`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SequenceLayout {
    pub area: Rect,
    pub back: Rect,
    pub track: Rect,
    pub forward: Rect,
    pub cell_width: u16,
    pub count: usize,
}

impl SequenceLayout {
    fn new(inner: Rect, count: usize) -> Option<Self> {
        if count == 0 || inner.height < 3 || inner.width < 12 {
            return None;
        }
        // 2 borders + "◀ " + track + " ▶"
        let max_track = inner.width - 6;
        let cell_width = if 3 * count <= max_track as usize { 3 } else { 1 };
        let track_width = (cell_width as usize * count).min(max_track as usize) as u16;

        let area = Rect::new(inner.x, inner.bottom() - 3, track_width + 6, 3);
        let y = area.y + 1;
        let back = Rect::new(area.x + 1, y, 2, 1);
        let track = Rect::new(back.right(), y, track_width, 1);
        let forward = Rect::new(track.right(), y, 2, 1);
        Some(Self {
            area,
            back,
            track,
            forward,
            cell_width,
            count,
        })
    }

    /// Cells on the track; fewer than `count` when the years are squeezed
    fn slots(&self) -> usize {
        (self.track.width / self.cell_width).max(1) as usize
    }

    /// Slider index under a column of the track. A squeezed track spreads
    /// the years over its cells so both ends stay reachable.
    pub fn index_at(&self, col: u16) -> usize {
        let slots = self.slots();
        let cell = ((col.saturating_sub(self.track.x) / self.cell_width) as usize).min(slots - 1);
        if self.count <= slots {
            return cell.min(self.count - 1);
        }
        (cell * (self.count - 1) + (slots - 1) / 2) / (slots - 1)
    }

    /// Track cell holding the knob for an index
    pub fn cell_of(&self, index: usize) -> usize {
        let slots = self.slots();
        let index = index.min(self.count - 1);
        if self.count <= slots {
            return index;
        }
        (index * (slots - 1) + (self.count - 1) / 2) / (self.count - 1)
    }
}

/// Screen regions for one frame; shared by drawing and mouse hit-testing
pub struct ScreenLayout {
    pub filter_bar: Rect,
    pub map: Rect,
    pub map_inner: Rect,
    pub status: Rect,
    pub filter_buttons: Vec<(Rect, FilterChoice)>,
    pub sequence: Option<SequenceLayout>,
    pub legend: Option<Rect>,
}

impl ScreenLayout {
    pub fn new(area: Rect, app: &App) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Filter buttons
                Constraint::Min(3),    // Map
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        let map = chunks[1];
        let map_inner = Block::default().borders(Borders::ALL).inner(map);
        let overlay = app.overlay();

        Self {
            filter_bar: chunks[0],
            map,
            map_inner,
            status: chunks[2],
            filter_buttons: filter_buttons(chunks[0], &app.filters),
            sequence: overlay.and_then(|o| SequenceLayout::new(map_inner, o.year_count())),
            legend: overlay
                .and_then(|o| o.legend())
                .map(|l| legend_rect(map_inner, l, &app.map_renderer)),
        }
    }

    /// Braille-pixel size of the map canvas
    pub fn map_pixels(&self) -> (usize, usize) {
        (self.map_inner.width as usize * 2, self.map_inner.height as usize * 4)
    }

    /// Resolve a mouse press. Controls sit on top of the map.
    pub fn hit(&self, col: u16, row: u16) -> Hit {
        let pos = Position::new(col, row);

        if let Some((_, choice)) = self.filter_buttons.iter().find(|(r, _)| r.contains(pos)) {
            return Hit::Action(Action::Filter(*choice));
        }

        if let Some(seq) = &self.sequence {
            if seq.back.contains(pos) {
                return Hit::Action(Action::StepBackward);
            }
            if seq.forward.contains(pos) {
                return Hit::Action(Action::StepForward);
            }
            if seq.track.contains(pos) {
                return Hit::Action(Action::SelectYear(seq.index_at(col)));
            }
            if seq.area.contains(pos) {
                return Hit::Control;
            }
        }

        if self.legend.is_some_and(|r| r.contains(pos)) {
            return Hit::Control;
        }

        if self.map_inner.contains(pos) {
            let px = (col - self.map_inner.x) as i32 * 2;
            let py = (row - self.map_inner.y) as i32 * 4;
            return Hit::Map(px, py);
        }

        Hit::None
    }
}

/// Button rects in the order they are drawn: `[Display all] [>100] ...`
fn filter_buttons(bar: Rect, filters: &[FilterChoice]) -> Vec<(Rect, FilterChoice)> {
    let mut x = bar.x + FILTER_PREFIX.chars().count() as u16;
    let mut buttons = Vec::with_capacity(filters.len());
    for choice in filters {
        let width = button_label(choice).chars().count() as u16;
        if x + width > bar.right() {
            break;
        }
        buttons.push((Rect::new(x, bar.y, width, 1), *choice));
        x += width + 1;
    }
    buttons
}

fn button_label(choice: &FilterChoice) -> String {
    format!("[{}]", choice.label())
}

/// Largest legend circle radius in braille dots
const LEGEND_MAX_RADIUS_PX: f64 = 12.0;

/// Dots per radius unit in the legend: the map's scale, shrunk so the
/// largest circle stays within [`LEGEND_MAX_RADIUS_PX`]
fn legend_scale(renderer: &MapRenderer, max_radius: f64) -> f64 {
    let scale = renderer.settings.symbol_scale;
    if max_radius * scale > LEGEND_MAX_RADIUS_PX {
        LEGEND_MAX_RADIUS_PX / max_radius
    } else {
        scale
    }
}

fn legend_radius_px(radius: f64, scale: f64) -> i32 {
    ((radius * scale).round() as i32).max(1)
}

/// Characters needed for the legend's nested circles
fn legend_circle_cells(max_radius_px: i32) -> (u16, u16) {
    let diameter = (2 * max_radius_px + 1).max(1) as u16;
    (diameter.div_ceil(2) + 1, diameter.div_ceil(4))
}

fn legend_line(entry: &LegendEntry) -> String {
    format!("{:<4} {}", entry.key.label(), entry.text())
}

/// Legend panel anchored to the top-right corner of the map
fn legend_rect(inner: Rect, legend: &Legend, renderer: &MapRenderer) -> Rect {
    let entries = legend.entries();
    let heading_width = legend.heading().chars().count() as u16 + 4;

    let (width, height) = match entries.first() {
        Some(max) => {
            let scale = legend_scale(renderer, max.radius);
            let (cols, rows) = legend_circle_cells(legend_radius_px(max.radius, scale));
            let text_width = entries
                .iter()
                .map(|e| legend_line(e).chars().count() as u16)
                .max()
                .unwrap_or(0);
            (heading_width.max(cols + 1 + text_width + 2), rows.max(3) + 2)
        }
        None => (heading_width.max(11), 3),
    };

    let width = width.min(inner.width);
    let height = height.min(inner.height);
    Rect::new(inner.right() - width, inner.y, width, height)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let layout = ScreenLayout::new(frame.area(), app);

    render_filter_bar(frame, app, &layout);
    render_map(frame, app, &layout);

    if let Some(overlay) = app.overlay() {
        if let Some(seq) = layout.sequence {
            frame.render_widget(
                SequenceWidget {
                    layout: seq,
                    index: overlay.index(),
                    year: overlay.attribute().to_string(),
                },
                seq.area,
            );
        }
        if let (Some(area), Some(legend)) = (layout.legend, overlay.legend()) {
            frame.render_widget(
                LegendWidget {
                    legend: legend.clone(),
                    renderer: &app.map_renderer,
                },
                area,
            );
        }
        if let Some(symbol) = overlay.popup() {
            if let (Some(popup), Some(radius)) = (&symbol.popup, symbol.radius) {
                let (px, py) = app.viewport.project(symbol.lon, symbol.lat);
                let r = app.map_renderer.pixel_radius(radius);
                let area = popup_rect(layout.map_inner, popup, px, py, r);
                frame.render_widget(Clear, area);
                frame.render_widget(PopupWidget { popup }, area);
            }
        }
    }

    render_banner(frame, app, &layout);
    render_status_bar(frame, app, layout.status);
}

fn render_filter_bar(frame: &mut Frame, app: &App, layout: &ScreenLayout) {
    let active = app.overlay().map(|o| o.filter().active_choice());
    let mut spans = vec![Span::styled(FILTER_PREFIX, Style::default().fg(Color::DarkGray))];
    for (_, choice) in &layout.filter_buttons {
        let style = match active {
            Some(a) if a == *choice => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            Some(_) => Style::default().fg(Color::White),
            None => Style::default().fg(Color::DarkGray),
        };
        spans.push(Span::styled(button_label(choice), style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), layout.filter_bar);
}

fn render_map(frame: &mut Frame, app: &App, layout: &ScreenLayout) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Acres Burned by Wildfire ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(block, layout.map);

    let inner = layout.map_inner;
    let mut viewport = app.viewport.clone();
    let (width, height) = layout.map_pixels();
    viewport.resize(width, height);

    let layers = app
        .map_renderer
        .render(inner.width as usize, inner.height as usize, &viewport, app.overlay());
    frame.render_widget(MapWidget { layers }, inner);
}

/// Braille map layers composited back to front
struct MapWidget {
    layers: MapLayers,
}

/// Copy the non-blank cells of a canvas into the buffer with one color
fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
    let rows = canvas.height().min(area.height as usize);
    let cols = canvas.width().min(area.width as usize);
    for row in 0..rows {
        for col in 0..cols {
            let ch = canvas.glyph(col, row);
            if ch == BLANK {
                continue;
            }
            buf[(area.x + col as u16, area.y + row as u16)]
                .set_char(ch)
                .set_fg(color);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        render_layer(&self.layers.basemap, Color::DarkGray, area, buf);
        render_layer(&self.layers.perimeters, PERIMETER_COLOR, area, buf);
        render_layer(&self.layers.symbols, SYMBOL_STYLE.fill, area, buf);
        render_layer(&self.layers.highlight, Color::White, area, buf);
    }
}

struct SequenceWidget {
    layout: SequenceLayout,
    index: usize,
    year: String,
}

impl Widget for SequenceWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        let title = format!(" {} ({}/{}) ", self.year, self.index + 1, self.layout.count);
        Block::bordered()
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))
            .render(area, buf);

        let button = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        buf.set_string(self.layout.back.x, self.layout.back.y, "◀ ", button);
        buf.set_string(self.layout.forward.x, self.layout.forward.y, " ▶", button);

        let track = self.layout.track;
        let w = self.layout.cell_width as usize;
        let knob_cell = self.layout.cell_of(self.index);
        for cell in 0..self.layout.slots().min(self.layout.count) {
            let x = track.x + (cell * w) as u16;
            let (text, style) = if cell == knob_cell {
                let knob = if w == 3 { "─●─" } else { "●" };
                (knob, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else {
                let rail = if w == 3 { "───" } else { "─" };
                (rail, Style::default().fg(Color::Gray))
            };
            buf.set_string(x, track.y, text, style);
        }
    }
}

struct LegendWidget<'a> {
    legend: Legend,
    renderer: &'a MapRenderer,
}

impl Widget for LegendWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        let block = Block::bordered()
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                self.legend.heading(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        block.render(area, buf);

        let entries = self.legend.entries();
        let Some(max) = entries.first() else {
            buf.set_string(inner.x, inner.y, "No data", Style::default().fg(Color::DarkGray));
            return;
        };

        // Circles share a baseline, largest behind, like nested bubbles
        let scale = legend_scale(self.renderer, max.radius);
        let max_r = legend_radius_px(max.radius, scale);
        let (cols, rows) = legend_circle_cells(max_r);
        let mut canvas = BrailleCanvas::new(cols as usize, rows as usize);
        let base = rows as i32 * 4 - 1;
        for entry in &entries {
            let r = legend_radius_px(entry.radius, scale);
            draw_ring(&mut canvas, max_r, base - r, r);
        }
        render_layer(&canvas, SYMBOL_STYLE.fill, inner, buf);

        let text_x = inner.x + cols + 1;
        for (i, entry) in entries.iter().enumerate() {
            let y = inner.y + i as u16;
            if y >= inner.bottom() || text_x >= inner.right() {
                break;
            }
            let width = (inner.right() - text_x) as usize;
            let line: String = legend_line(entry).chars().take(width).collect();
            buf.set_string(text_x, y, line, Style::default().fg(Color::White));
        }
    }
}

/// Popup box above the symbol, or below it when there is no room
fn popup_rect(inner: Rect, popup: &Popup, px: i32, py: i32, radius_px: i32) -> Rect {
    let text_width = popup
        .identity_line
        .chars()
        .count()
        .max(popup.value_line.chars().count()) as u16;
    let width = (text_width + 4).min(inner.width);
    let height = 4u16.min(inner.height);

    let cx = px.div_euclid(2);
    let cy = py.div_euclid(4);
    let r_rows = (radius_px + 3) / 4;

    let above = cy - r_rows - height as i32;
    let top = if above >= 0 { above } else { cy + r_rows + 1 };
    let top = top.clamp(0, (inner.height - height) as i32) as u16;
    let left = (cx - width as i32 / 2).clamp(0, (inner.width - width) as i32) as u16;

    Rect::new(inner.x + left, inner.y + top, width, height)
}

struct PopupWidget<'a> {
    popup: &'a Popup,
}

impl Widget for PopupWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::from(Span::styled(
                self.popup.identity_line.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(self.popup.value_line.clone()),
        ];
        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .border_style(Style::default().fg(SYMBOL_STYLE.fill))
                    .padding(ratatui::widgets::Padding::horizontal(1)),
            )
            .render(area, buf);
    }
}

/// Loading / unavailable notice centered on the map
fn render_banner(frame: &mut Frame, app: &App, layout: &ScreenLayout) {
    let (text, color) = match &app.data {
        DataState::Ready(_) => return,
        DataState::Loading(_) => (format!("Loading fire data from {}…", app.source), Color::Cyan),
        DataState::Unavailable(reason) => (format!("Data unavailable: {reason}"), Color::Red),
    };

    let inner = layout.map_inner;
    let width = (text.chars().count() as u16 + 4).min(inner.width);
    let height = 3u16.min(inner.height);
    let area = Rect::new(
        inner.x + (inner.width - width) / 2,
        inner.y + (inner.height - height) / 2,
        width,
        height,
    );
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(color)))
            .block(Block::bordered().border_style(Style::default().fg(color))),
        area,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;
    let dim = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled(" Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", dim),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", dim),
    ];

    if let Some(overlay) = app.overlay() {
        let drawable = overlay.symbols.iter().filter(|s| s.is_drawable()).count();
        let shown = overlay.shown_symbols().count();
        spans.push(Span::styled(
            format!("{} shown / {} fires ", shown, drawable),
            Style::default().fg(Color::Magenta),
        ));
        spans.push(Span::styled("| ", dim));
    }

    spans.push(Span::styled(
        if settings.show_basemap { "[B]ase " } else { "[b]ase " },
        Style::default().fg(if settings.show_basemap { Color::Green } else { Color::DarkGray }),
    ));
    spans.push(Span::styled(
        if settings.show_perimeters { "[P]erim " } else { "[p]erim " },
        Style::default().fg(if settings.show_perimeters { Color::Green } else { Color::DarkGray }),
    ));
    spans.push(Span::styled(
        if settings.show_symbols { "[S]ymbols " } else { "[s]ymbols " },
        Style::default().fg(if settings.show_symbols { Color::Green } else { Color::DarkGray }),
    ));
    spans.push(Span::styled(
        "| ←/→:year a/1-9:filter hjkl:pan +/-:zoom r:reset q:quit",
        dim,
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
