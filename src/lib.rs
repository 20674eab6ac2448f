// rocm-top library - Public API

// Re-export error types
pub mod error;
pub use error::{Result, TopError};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use core::config::MonitorConfig;

// Initialize logging. Defaults to warnings; RUST_LOG overrides.
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}
