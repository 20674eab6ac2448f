use anyhow::Result;

use crate::platform::gpu::driver;

pub fn execute() -> Result<()> {
    println!("rocm-top version {}", env!("CARGO_PKG_VERSION"));
    println!(
        "ROCm SMI support: {}",
        if cfg!(all(unix, feature = "rocm")) {
            "enabled"
        } else {
            "not compiled in"
        }
    );
    println!(
        "amdgpu driver: {}",
        if driver::driver_initialized() {
            "live"
        } else {
            "not loaded"
        }
    );
    Ok(())
}
