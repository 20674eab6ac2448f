//! GPU-specific platform code.
//!
//! Backs the metrics provider with the ROCm SMI library.

mod amd;
pub mod driver;

pub use amd::AmdGpuProvider;

use crate::core::gpu_monitor::MetricsProvider;
use crate::error::Result;

/// Initialize the GPU metrics provider.
///
/// Fails with `DriverNotLoaded` when amdgpu is not live, `ProviderInit` when
/// ROCm SMI refuses to start, and `ProviderUnavailable` when the binary was
/// built without ROCm support.
pub fn open_provider() -> Result<Box<dyn MetricsProvider>> {
    #[cfg(all(unix, feature = "rocm"))]
    {
        let provider = AmdGpuProvider::init()?;
        Ok(Box::new(provider))
    }
    #[cfg(not(all(unix, feature = "rocm")))]
    {
        // Reports a missing driver before the missing library.
        AmdGpuProvider::init()?;
        Err(crate::error::TopError::provider_unavailable(
            "ROCm SMI support not compiled in",
        ))
    }
}
