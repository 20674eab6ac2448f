//! Per-device metrics sampling.
//!
//! Each counter is read on its own. A counter the provider cannot deliver
//! becomes `None` in the sample; it never hides the counters that did work.

use super::metrics::{DeviceHandle, DeviceMetrics};
use super::provider::{MetricsProvider, PowerKind, ProviderResult, TemperatureSensor};

/// Take one sample of `device`.
pub fn sample(provider: &dyn MetricsProvider, device: DeviceHandle) -> DeviceMetrics {
    DeviceMetrics {
        device_id: device,
        name: field(device, "name", provider.device_name(device)),
        temperature_c: read_temperature(provider, device),
        performance_level: field(device, "performance level", provider.performance_level(device)),
        power_watts: read_power(provider, device),
        power_cap_watts: field(device, "power cap", provider.power_cap(device)),
        memory_used_bytes: field(device, "VRAM used", provider.memory_used(device)),
        memory_total_bytes: field(device, "VRAM total", provider.memory_total(device)),
        memory_busy_percent: field(device, "memory busy", provider.memory_busy_percent(device)),
        utilization_percent: field(device, "GPU busy", provider.busy_percent(device)),
    }
}

fn field<T>(device: DeviceHandle, what: &str, result: ProviderResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("GPU {}: {} unavailable: {}", device, what, e);
            None
        }
    }
}

/// Edge sensor first; boards without one only report junction temperature.
fn read_temperature(provider: &dyn MetricsProvider, device: DeviceHandle) -> Option<f64> {
    provider
        .temperature(device, TemperatureSensor::Edge)
        .or_else(|_| provider.temperature(device, TemperatureSensor::Junction))
        .map_err(|e| log::debug!("GPU {}: temperature unavailable: {}", device, e))
        .ok()
}

fn read_power(provider: &dyn MetricsProvider, device: DeviceHandle) -> Option<f64> {
    let reading = field(device, "power", provider.power(device))?;
    if reading.kind == PowerKind::Invalid {
        log::debug!("GPU {}: power reported with invalid power type", device);
        return None;
    }
    Some(reading.watts)
}
