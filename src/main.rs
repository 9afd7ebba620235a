use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use fire_map::app::{Action, App};
use fire_map::config::{Cli, Config};
use fire_map::data;
use fire_map::ui::{self, Hit, ScreenLayout};
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Owns the terminal for the lifetime of the app; restores it on drop,
/// including when `run` returns early with an error
struct TerminalGuard {
    terminal: DefaultTerminal,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        let mut terminal = ratatui::init();
        terminal.clear()?;
        execute!(std::io::stdout(), EnableMouseCapture)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        ratatui::restore();
    }
}

fn main() -> Result<()> {
    let config = Cli::parse().into_config().unwrap_or_else(|e| e.exit());
    init_logging(config.log_file.as_deref())?;
    info!(source = %config.source, legend = config.legend, "starting fire-map");

    let mut guard = TerminalGuard::new()?;
    run(&mut guard.terminal, &config)
}

/// Logs go to a file when asked for; stdout belongs to the map
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn screen_area(terminal: &DefaultTerminal) -> Result<Rect> {
    let size = terminal.size()?;
    Ok(Rect::new(0, 0, size.width, size.height))
}

/// Keep the viewport in step with the map canvas
fn fit_viewport(app: &mut App, area: Rect) {
    let (width, height) = ScreenLayout::new(area, app).map_pixels();
    app.resize(width, height);
}

/// Translate a key press into an action or a viewport change
fn handle_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.dispatch(Action::Quit),

        // Year sequence
        KeyCode::Right | KeyCode::Char(']') => app.dispatch(Action::StepForward),
        KeyCode::Left | KeyCode::Char('[') => app.dispatch(Action::StepBackward),
        KeyCode::Home => app.dispatch(Action::FirstYear),
        KeyCode::End => app.dispatch(Action::LastYear),

        // Filters: 'a' shows everything, digits pick a threshold button
        KeyCode::Char('a') | KeyCode::Char('A') => app.dispatch(Action::FilterSlot(0)),
        KeyCode::Char(c @ '1'..='9') => {
            let slot = c as usize - '0' as usize;
            app.dispatch(Action::FilterSlot(slot));
        }

        // Pan with hjkl or up/down
        KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Layer toggles
        KeyCode::Char('b') | KeyCode::Char('B') => app.dispatch(Action::ToggleBasemap),
        KeyCode::Char('p') | KeyCode::Char('P') => app.dispatch(Action::TogglePerimeters),
        KeyCode::Char('s') | KeyCode::Char('S') => app.dispatch(Action::ToggleSymbols),
        KeyCode::Char('x') => app.dispatch(Action::ClosePopup),

        KeyCode::Char('r') | KeyCode::Char('0') => app.dispatch(Action::ResetView),

        _ => {}
    }
}

/// Handle mouse events: controls first, then the map
fn handle_mouse(app: &mut App, layout: &ScreenLayout, mouse: MouseEvent) {
    let hit = layout.hit(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => match hit {
            Hit::Action(action) => app.dispatch(action),
            Hit::Map(px, py) => app.click_map(px, py, mouse.column, mouse.row),
            Hit::Control | Hit::None => {}
        },
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        MouseEventKind::ScrollUp => {
            if let Hit::Map(px, py) = hit {
                app.zoom_in_at(px, py);
            }
        }
        MouseEventKind::ScrollDown => {
            if let Hit::Map(px, py) = hit {
                app.zoom_out_at(px, py);
            }
        }
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: &Config) -> Result<()> {
    let mut area = screen_area(terminal)?;
    let mut app = App::new(config, App::start_load(config), 0, 0);
    fit_viewport(&mut app, area);

    if let Some(path) = &config.basemap {
        if let Err(e) = data::load_basemap(&mut app.map_renderer, path) {
            warn!("basemap not loaded: {e:#}");
        }
    }

    // Main loop
    loop {
        if app.poll_data() {
            // Legend and slider appear once data arrives
            fit_viewport(&mut app, area);
        }

        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key.code),
                Event::Mouse(mouse) => {
                    let layout = ScreenLayout::new(area, &app);
                    handle_mouse(&mut app, &layout, mouse);
                }
                Event::Resize(width, height) => {
                    area = Rect::new(0, 0, width, height);
                    fit_viewport(&mut app, area);
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
