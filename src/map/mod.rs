mod geometry;
mod projection;
mod renderer;

pub use geometry::{draw_circle, draw_ring};
pub use projection::Viewport;
pub use renderer::{DisplaySettings, MapLayers, MapRenderer};
