//! Terminal User Interface for GPU monitoring.
//!
//! Redraws the latest frame published by the refresh loop using ratatui.

mod app;
mod event_handler;
mod render;

pub use app::{run_monitor_app, MonitorApp, MonitorAppConfig};
pub use event_handler::MonitorEvent;
