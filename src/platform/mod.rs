// Platform-specific code module

pub mod gpu;
pub mod process;

pub use gpu::open_provider;
pub use process::SysinfoProcessSource;
