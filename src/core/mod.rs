// Core monitoring logic module

pub mod config;
pub mod gpu_monitor;

// Re-export commonly used items
pub use config::MonitorConfig;
pub use gpu_monitor::{Frame, FrameBuilder, MonitorRuntime};
