//! Compute process attribution.
//!
//! Maps every PID holding a compute context to the devices it runs on and
//! the VRAM, SDMA and CU resources it holds there.

use std::collections::{BTreeSet, HashSet};

use super::metrics::{DeviceHandle, ProcessGpuUsage};
use super::provider::{fetch_sized, MetricsProvider, RawProcessUsage, CU_OCCUPANCY_INVALID};

/// Usage of one process on one device. Fields are individually optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceProcessUsage {
    pub vram_used_bytes: Option<u64>,
    pub dma_usage_bytes: Option<u64>,
    pub cu_occupancy_percent: Option<u32>,
}

impl From<RawProcessUsage> for DeviceProcessUsage {
    fn from(raw: RawProcessUsage) -> Self {
        Self {
            vram_used_bytes: Some(raw.vram_usage),
            dma_usage_bytes: Some(raw.sdma_usage),
            cu_occupancy_percent: (raw.cu_occupancy != CU_OCCUPANCY_INVALID)
                .then_some(raw.cu_occupancy),
        }
    }
}

/// PIDs with a compute context, each listed once, in provider order.
pub fn list_compute_processes(provider: &dyn MetricsProvider) -> Vec<u32> {
    let pids = match provider.compute_process_ids() {
        Ok(pids) => pids,
        Err(e) => {
            log::debug!("Unable to list compute processes: {}", e);
            return Vec::new();
        }
    };

    let mut seen = HashSet::with_capacity(pids.len());
    pids.into_iter().filter(|pid| seen.insert(*pid)).collect()
}

/// Devices `pid` has a compute context on. Empty when the lookup fails.
///
/// The provider cannot say up front how many devices a process uses, so
/// this asks for the count first and then fetches into a buffer of that size
/// plus some slack.
pub fn devices_for(provider: &dyn MetricsProvider, pid: u32) -> BTreeSet<DeviceHandle> {
    let count = match provider.compute_process_device_count(pid) {
        Ok(count) => count,
        Err(e) => {
            log::debug!("Unable to fetch GPU number for PID {}: {}", pid, e);
            return BTreeSet::new();
        }
    };
    if count == 0 {
        return BTreeSet::new();
    }

    let fetched = fetch_sized("compute_process_devices", count as usize, 0u32, |buffer| {
        match provider.compute_process_devices(pid, buffer) {
            Ok(written) => (None, written),
            Err(e) => (Some(e.status), 0),
        }
    });
    match fetched {
        Ok(indices) => indices.into_iter().map(DeviceHandle).collect(),
        Err(e) => {
            log::debug!("Unable to fetch GPU list for PID {}: {}", pid, e);
            BTreeSet::new()
        }
    }
}

/// Resources `pid` holds on `device`; all `None` when the query fails.
pub fn usage_on(provider: &dyn MetricsProvider, pid: u32, device: DeviceHandle) -> DeviceProcessUsage {
    match provider.compute_process_usage(pid, device) {
        Ok(raw) => raw.into(),
        Err(e) => {
            log::debug!("Unable to fetch process info for PID {} on GPU {}: {}", pid, device, e);
            DeviceProcessUsage::default()
        }
    }
}

/// Full attribution for one process, folding its per-device usage together.
///
/// VRAM and SDMA add up across devices; CU occupancy keeps the highest
/// reading. A device that reported nothing contributes nothing.
pub fn attribute(provider: &dyn MetricsProvider, pid: u32) -> ProcessGpuUsage {
    let device_ids = devices_for(provider, pid);
    let mut usage = ProcessGpuUsage::unattributed(pid);

    for device in &device_ids {
        let on_device = usage_on(provider, pid, *device);
        usage.vram_used_bytes = add(usage.vram_used_bytes, on_device.vram_used_bytes);
        usage.dma_usage_bytes = add(usage.dma_usage_bytes, on_device.dma_usage_bytes);
        usage.cu_occupancy_percent = usage
            .cu_occupancy_percent
            .max(on_device.cu_occupancy_percent);
    }

    usage.device_ids = device_ids;
    usage
}

/// Attribute every compute process. No per-process call is made when the
/// process list is empty.
pub fn attribute_all(provider: &dyn MetricsProvider) -> Vec<ProcessGpuUsage> {
    list_compute_processes(provider)
        .into_iter()
        .map(|pid| attribute(provider, pid))
        .collect()
}

fn add(total: Option<u64>, value: Option<u64>) -> Option<u64> {
    match (total, value) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, b) => a.or(b),
    }
}
