pub mod app;
pub mod braille;
pub mod config;
pub mod controls;
pub mod data;
pub mod error;
pub mod map;
pub mod overlay;
pub mod symbols;
pub mod ui;
