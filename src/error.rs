use thiserror::Error;

use crate::core::gpu_monitor::ProviderError;

/// Custom error type for rocm-top
#[derive(Error, Debug)]
pub enum TopError {
    /// The amdgpu kernel driver is not loaded, so there is nothing to query.
    #[error("Driver not initialized (amdgpu not found in modules)")]
    DriverNotLoaded,

    /// The provider library is present but refused to initialize.
    #[error("ROCm SMI initialization failed: {0}")]
    ProviderInit(ProviderError),

    #[error("GPU provider not available: {0}")]
    ProviderUnavailable(String),

    #[error("Device enumeration failed: {0}")]
    DeviceEnumeration(ProviderError),
}

/// Result type alias for rocm-top
pub type Result<T> = std::result::Result<T, TopError>;

impl TopError {
    pub fn provider_unavailable<S: Into<String>>(msg: S) -> Self {
        TopError::ProviderUnavailable(msg.into())
    }

    /// Whether this error must stop the program before any frame is drawn.
    pub fn is_fatal_init(&self) -> bool {
        matches!(
            self,
            TopError::DriverNotLoaded | TopError::ProviderInit(_) | TopError::ProviderUnavailable(_)
        )
    }

    /// Process exit status used when this error terminates the program.
    pub fn exit_code(&self) -> i32 {
        match self {
            TopError::DriverNotLoaded => 2,
            TopError::ProviderInit(_) => 3,
            TopError::ProviderUnavailable(_) => 4,
            _ => 1,
        }
    }
}
