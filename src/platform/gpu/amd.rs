use crate::error::{Result, TopError};

#[cfg(all(unix, feature = "rocm"))]
use crate::core::gpu_monitor::{
    fetch_sized, DeviceHandle, LibraryVersion, MetricsProvider, PerformanceLevel, PowerKind,
    PowerReading, ProviderError, ProviderResult, ProviderStatus, RawProcessUsage,
    TemperatureSensor,
};

use super::driver;

#[cfg(all(unix, feature = "rocm"))]
use parking_lot::Mutex;
#[cfg(all(unix, feature = "rocm"))]
use rocm_smi_lib::{RocmErr, RocmSmi, RsmiTemperatureMetric, RsmiTemperatureType};

// Raw calls the wrapper does not expose one counter at a time.
#[cfg(all(unix, feature = "rocm"))]
use rocm_smi_lib::{
    rsmi_compute_process_gpus_get, rsmi_compute_process_info_by_device_get,
    rsmi_compute_process_info_get, rsmi_dev_memory_busy_percent_get, rsmi_dev_memory_total_get,
    rsmi_dev_memory_usage_get, rsmi_dev_name_get, rsmi_dev_power_cap_get, rsmi_dev_power_get,
    rsmi_memory_type_t_RSMI_MEM_TYPE_VRAM, rsmi_process_info_t, rsmi_shut_down, rsmi_version_get,
    rsmi_version_t, RSMI_POWER_TYPE_RSMI_AVERAGE_POWER, RSMI_POWER_TYPE_RSMI_CURRENT_POWER,
};

/// Device name buffer size passed to `rsmi_dev_name_get`.
#[cfg(all(unix, feature = "rocm"))]
const NAME_BUFFER_LEN: usize = 256;

/// AMD GPU provider backed by the ROCm SMI library.
///
/// The library is initialized once in [`AmdGpuProvider::init`] and shut down
/// when the provider is dropped.
pub struct AmdGpuProvider {
    #[cfg(all(unix, feature = "rocm"))]
    rocm: Mutex<RocmSmi>,
}

#[cfg(all(unix, feature = "rocm"))]
fn check(call: &'static str, status: u32) -> ProviderResult<()> {
    match ProviderStatus::from_code(status) {
        None => Ok(()),
        Some(status) => Err(ProviderError::new(call, status)),
    }
}

#[cfg(all(unix, feature = "rocm"))]
fn rocm_error(call: &'static str) -> impl FnOnce(RocmErr) -> ProviderError {
    move |err| {
        let code: u32 = err.into();
        let status = ProviderStatus::from_code(code).unwrap_or(ProviderStatus::Unknown(code));
        ProviderError::new(call, status)
    }
}

#[cfg(all(unix, feature = "rocm"))]
fn empty_process_info() -> rsmi_process_info_t {
    rsmi_process_info_t {
        process_id: 0,
        pasid: 0,
        vram_usage: 0,
        sdma_usage: 0,
        cu_occupancy: 0,
    }
}

impl AmdGpuProvider {
    /// Verify the amdgpu driver is live, then initialize ROCm SMI.
    pub fn init() -> Result<Self> {
        if !driver::driver_initialized() {
            return Err(TopError::DriverNotLoaded);
        }

        #[cfg(all(unix, feature = "rocm"))]
        {
            let rocm = RocmSmi::init()
                .map_err(rocm_error("rsmi_init"))
                .map_err(TopError::ProviderInit)?;
            log::debug!("ROCm SMI initialized");
            Ok(Self {
                rocm: Mutex::new(rocm),
            })
        }
        #[cfg(not(all(unix, feature = "rocm")))]
        {
            Err(TopError::provider_unavailable(
                "ROCm SMI support not compiled in (rebuild with --features rocm)",
            ))
        }
    }
}

#[cfg(all(unix, feature = "rocm"))]
impl Drop for AmdGpuProvider {
    fn drop(&mut self) {
        // SAFETY: paired with the successful rsmi_init in `RocmSmi::init`.
        let status = unsafe { rsmi_shut_down() };
        if let Err(e) = check("rsmi_shut_down", status) {
            log::warn!("{}", e);
        }
    }
}

#[cfg(all(unix, feature = "rocm"))]
impl MetricsProvider for AmdGpuProvider {
    fn device_count(&self) -> ProviderResult<u32> {
        Ok(self.rocm.lock().get_device_count())
    }

    fn library_version(&self) -> ProviderResult<LibraryVersion> {
        let mut version = rsmi_version_t {
            major: 0,
            minor: 0,
            patch: 0,
            build: std::ptr::null(),
        };
        check("rsmi_version_get", unsafe { rsmi_version_get(&mut version) })?;
        Ok(LibraryVersion {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
        })
    }

    fn device_name(&self, device: DeviceHandle) -> ProviderResult<String> {
        let mut buffer = [0 as std::ffi::c_char; NAME_BUFFER_LEN];
        check("rsmi_dev_name_get", unsafe {
            rsmi_dev_name_get(device.index(), buffer.as_mut_ptr(), buffer.len())
        })?;
        buffer[NAME_BUFFER_LEN - 1] = 0;
        let name = unsafe { std::ffi::CStr::from_ptr(buffer.as_ptr()) };
        Ok(name.to_string_lossy().trim().to_string())
    }

    fn temperature(&self, device: DeviceHandle, sensor: TemperatureSensor) -> ProviderResult<f64> {
        let sensor = match sensor {
            TemperatureSensor::Edge => RsmiTemperatureType::Edge,
            TemperatureSensor::Junction => RsmiTemperatureType::Junction,
            TemperatureSensor::Memory => RsmiTemperatureType::Memory,
        };
        self.rocm
            .lock()
            .get_device_temperature_metric(device.index(), sensor, RsmiTemperatureMetric::Current)
            .map_err(rocm_error("rsmi_dev_temp_metric_get"))
    }

    fn performance_level(&self, device: DeviceHandle) -> ProviderResult<PerformanceLevel> {
        let level = self
            .rocm
            .lock()
            .get_device_performance_level(device.index())
            .map_err(rocm_error("rsmi_dev_perf_level_get"))?;
        Ok(PerformanceLevel::from_raw(level as u32))
    }

    fn power(&self, device: DeviceHandle) -> ProviderResult<PowerReading> {
        let mut microwatts = 0u64;
        let mut power_type = 0u32;
        check("rsmi_dev_power_get", unsafe {
            rsmi_dev_power_get(device.index(), &mut microwatts, &mut power_type)
        })?;
        let kind = match power_type {
            RSMI_POWER_TYPE_RSMI_AVERAGE_POWER => PowerKind::Average,
            RSMI_POWER_TYPE_RSMI_CURRENT_POWER => PowerKind::Current,
            _ => PowerKind::Invalid,
        };
        Ok(PowerReading {
            watts: microwatts as f64 / 1e6,
            kind,
        })
    }

    fn power_cap(&self, device: DeviceHandle) -> ProviderResult<f64> {
        let mut microwatts = 0u64;
        check("rsmi_dev_power_cap_get", unsafe {
            rsmi_dev_power_cap_get(device.index(), 0, &mut microwatts)
        })?;
        Ok(microwatts as f64 / 1e6)
    }

    fn memory_used(&self, device: DeviceHandle) -> ProviderResult<u64> {
        let mut used = 0u64;
        check("rsmi_dev_memory_usage_get", unsafe {
            rsmi_dev_memory_usage_get(device.index(), rsmi_memory_type_t_RSMI_MEM_TYPE_VRAM, &mut used)
        })?;
        Ok(used)
    }

    fn memory_total(&self, device: DeviceHandle) -> ProviderResult<u64> {
        let mut total = 0u64;
        check("rsmi_dev_memory_total_get", unsafe {
            rsmi_dev_memory_total_get(device.index(), rsmi_memory_type_t_RSMI_MEM_TYPE_VRAM, &mut total)
        })?;
        Ok(total)
    }

    fn memory_busy_percent(&self, device: DeviceHandle) -> ProviderResult<u32> {
        let mut busy = 0u32;
        check("rsmi_dev_memory_busy_percent_get", unsafe {
            rsmi_dev_memory_busy_percent_get(device.index(), &mut busy)
        })?;
        Ok(busy)
    }

    fn busy_percent(&self, device: DeviceHandle) -> ProviderResult<u32> {
        self.rocm
            .lock()
            .get_device_busy_percent(device.index())
            .map_err(rocm_error("rsmi_dev_busy_percent_get"))
    }

    fn compute_process_ids(&self) -> ProviderResult<Vec<u32>> {
        let mut count = 0u32;
        check("rsmi_compute_process_info_get", unsafe {
            rsmi_compute_process_info_get(std::ptr::null_mut(), &mut count)
        })?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let procs = fetch_sized(
            "rsmi_compute_process_info_get",
            count as usize,
            empty_process_info(),
            |buffer| {
                let mut written = buffer.len() as u32;
                let status =
                    unsafe { rsmi_compute_process_info_get(buffer.as_mut_ptr(), &mut written) };
                (ProviderStatus::from_code(status), written as usize)
            },
        )?;
        Ok(procs.iter().map(|p| p.process_id).collect())
    }

    fn compute_process_device_count(&self, pid: u32) -> ProviderResult<u32> {
        let mut count = 0u32;
        check("rsmi_compute_process_gpus_get", unsafe {
            rsmi_compute_process_gpus_get(pid, std::ptr::null_mut(), &mut count)
        })?;
        Ok(count)
    }

    fn compute_process_devices(&self, pid: u32, indices: &mut [u32]) -> ProviderResult<usize> {
        let mut written = indices.len() as u32;
        let status =
            unsafe { rsmi_compute_process_gpus_get(pid, indices.as_mut_ptr(), &mut written) };
        match ProviderStatus::from_code(status) {
            None | Some(ProviderStatus::InsufficientSize) => {
                Ok((written as usize).min(indices.len()))
            }
            Some(status) => Err(ProviderError::new("rsmi_compute_process_gpus_get", status)),
        }
    }

    fn compute_process_usage(&self, pid: u32, device: DeviceHandle) -> ProviderResult<RawProcessUsage> {
        let mut info = empty_process_info();
        check("rsmi_compute_process_info_by_device_get", unsafe {
            rsmi_compute_process_info_by_device_get(pid, device.index(), &mut info)
        })?;
        Ok(RawProcessUsage {
            vram_usage: info.vram_usage,
            sdma_usage: info.sdma_usage,
            cu_occupancy: info.cu_occupancy,
        })
    }
}
