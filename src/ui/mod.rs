// UI and formatting module

pub mod formatters;
pub mod monitor_tui;
pub mod smi_table;

// Re-export commonly used items for cleaner imports
pub use formatters::{bytes_to_mib, format_mib, format_temperature};
pub use smi_table::{render_frame, RenderOptions};
