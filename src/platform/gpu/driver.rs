//! amdgpu kernel driver detection.

use std::fs;
use std::path::Path;

const INITSTATE_PATH: &str = "/sys/module/amdgpu/initstate";
const MODULES_PATH: &str = "/proc/modules";

/// Whether the amdgpu driver is loaded and initialized.
pub fn driver_initialized() -> bool {
    driver_initialized_at(Path::new(INITSTATE_PATH), Path::new(MODULES_PATH))
}

/// Check `initstate` for "live"; when it cannot be read, fall back to looking
/// for an `amdgpu` entry in the module list.
pub fn driver_initialized_at(initstate: &Path, modules: &Path) -> bool {
    if let Ok(state) = fs::read_to_string(initstate) {
        return state.trim() == "live";
    }

    match fs::read_to_string(modules) {
        Ok(list) => list
            .lines()
            .any(|line| line.split_whitespace().next() == Some("amdgpu")),
        Err(e) => {
            log::debug!("Cannot read {:?}: {}", modules, e);
            false
        }
    }
}
