pub mod api;
pub mod config;
pub mod format;
pub mod models;
pub mod session;
pub mod tui;
