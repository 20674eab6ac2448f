//! Scripted provider and process source for exercising the pipeline without
//! GPU hardware.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::enrich::{LookupError, ProcessInfoSource};
use super::metrics::{DeviceHandle, LibraryVersion, PerformanceLevel, ProcessInfo};
use super::provider::{
    fetch_sized, MetricsProvider, PowerKind, PowerReading, ProviderError, ProviderResult, ProviderStatus,
    RawProcessUsage, TemperatureSensor,
};

/// Canned readings for one device. `None` makes the matching getter fail
/// with `NotSupported`.
#[derive(Debug, Clone, Default)]
pub struct FakeDevice {
    pub name: Option<String>,
    pub edge_temp: Option<f64>,
    pub junction_temp: Option<f64>,
    pub perf_level: Option<PerformanceLevel>,
    pub power: Option<PowerReading>,
    pub power_cap: Option<f64>,
    pub memory_used: Option<u64>,
    pub memory_total: Option<u64>,
    pub memory_busy: Option<u32>,
    pub busy: Option<u32>,
}

impl FakeDevice {
    /// A device with every counter readable.
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            edge_temp: Some(45.0),
            junction_temp: Some(50.0),
            perf_level: Some(PerformanceLevel::Auto),
            power: Some(PowerReading {
                watts: 35.0,
                kind: PowerKind::Average,
            }),
            power_cap: Some(220.0),
            memory_used: Some(512 * 1024 * 1024),
            memory_total: Some(16 * 1024 * 1024 * 1024),
            memory_busy: Some(3),
            busy: Some(12),
        }
    }

    /// A device on which nothing can be read.
    pub fn broken() -> Self {
        Self::default()
    }
}

/// Canned attribution for one compute process.
#[derive(Debug, Clone, Default)]
pub struct FakeProcess {
    pub pid: u32,
    /// `None` makes the device count query fail.
    pub devices: Option<Vec<u32>>,
    /// Count returned by the size query when it lags `devices`.
    pub reported_device_count: Option<u32>,
    /// Usage per device index; a missing entry makes the usage query fail.
    pub usage: HashMap<u32, RawProcessUsage>,
}

impl FakeProcess {
    pub fn on(pid: u32, device: u32, usage: RawProcessUsage) -> Self {
        let mut map = HashMap::new();
        map.insert(device, usage);
        Self {
            pid,
            devices: Some(vec![device]),
            reported_device_count: None,
            usage: map,
        }
    }

    pub fn with_device(mut self, device: u32, usage: RawProcessUsage) -> Self {
        self.devices.get_or_insert_with(Vec::new).push(device);
        self.usage.insert(device, usage);
        self
    }
}

/// Call counters, so tests can assert which provider calls were skipped.
#[derive(Debug, Default)]
pub struct FakeCalls {
    device_count: AtomicUsize,
    process_list: AtomicUsize,
    device_list_fetch: AtomicUsize,
    process_usage: AtomicUsize,
}

impl FakeCalls {
    pub fn process_list(&self) -> usize {
        self.process_list.load(Ordering::SeqCst)
    }

    pub fn device_list_fetch(&self) -> usize {
        self.device_list_fetch.load(Ordering::SeqCst)
    }

    pub fn process_usage(&self) -> usize {
        self.process_usage.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct FakeProvider {
    pub devices: Vec<FakeDevice>,
    pub device_count_error: Option<ProviderStatus>,
    pub version: Option<LibraryVersion>,
    /// `None` makes the compute process listing fail.
    pub processes: Option<Vec<FakeProcess>>,
    /// Processes that start between the size query and the fetch of the
    /// process list.
    pub late_processes: Vec<FakeProcess>,
    pub calls: FakeCalls,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            version: Some(LibraryVersion {
                major: 6,
                minor: 1,
                patch: 2,
            }),
            processes: Some(Vec::new()),
            ..Default::default()
        }
    }

    pub fn with_device(mut self, device: FakeDevice) -> Self {
        self.devices.push(device);
        self
    }

    pub fn with_process(mut self, process: FakeProcess) -> Self {
        self.processes.get_or_insert_with(Vec::new).push(process);
        self
    }

    pub fn with_late_process(mut self, process: FakeProcess) -> Self {
        self.late_processes.push(process);
        self
    }

    fn device(&self, device: DeviceHandle, call: &'static str) -> ProviderResult<&FakeDevice> {
        self.devices
            .get(device.index() as usize)
            .ok_or(ProviderError::new(call, ProviderStatus::InvalidArgs))
    }

    fn process(&self, pid: u32, call: &'static str) -> ProviderResult<&FakeProcess> {
        self.processes
            .as_ref()
            .and_then(|procs| procs.iter().chain(&self.late_processes).find(|p| p.pid == pid))
            .ok_or(ProviderError::new(call, ProviderStatus::NotFound))
    }
}

fn read<T: Clone>(value: &Option<T>, call: &'static str) -> ProviderResult<T> {
    value
        .clone()
        .ok_or(ProviderError::new(call, ProviderStatus::NotSupported))
}

impl MetricsProvider for FakeProvider {
    fn device_count(&self) -> ProviderResult<u32> {
        self.calls.device_count.fetch_add(1, Ordering::SeqCst);
        match self.device_count_error {
            Some(status) => Err(ProviderError::new("device_count", status)),
            None => Ok(self.devices.len() as u32),
        }
    }

    fn library_version(&self) -> ProviderResult<LibraryVersion> {
        read(&self.version, "library_version")
    }

    fn device_name(&self, device: DeviceHandle) -> ProviderResult<String> {
        read(&self.device(device, "device_name")?.name, "device_name")
    }

    fn temperature(&self, device: DeviceHandle, sensor: TemperatureSensor) -> ProviderResult<f64> {
        let dev = self.device(device, "temperature")?;
        match sensor {
            TemperatureSensor::Edge => read(&dev.edge_temp, "temperature"),
            TemperatureSensor::Junction => read(&dev.junction_temp, "temperature"),
            TemperatureSensor::Memory => read(&None, "temperature"),
        }
    }

    fn performance_level(&self, device: DeviceHandle) -> ProviderResult<PerformanceLevel> {
        read(&self.device(device, "performance_level")?.perf_level, "performance_level")
    }

    fn power(&self, device: DeviceHandle) -> ProviderResult<PowerReading> {
        read(&self.device(device, "power")?.power, "power")
    }

    fn power_cap(&self, device: DeviceHandle) -> ProviderResult<f64> {
        read(&self.device(device, "power_cap")?.power_cap, "power_cap")
    }

    fn memory_used(&self, device: DeviceHandle) -> ProviderResult<u64> {
        read(&self.device(device, "memory_used")?.memory_used, "memory_used")
    }

    fn memory_total(&self, device: DeviceHandle) -> ProviderResult<u64> {
        read(&self.device(device, "memory_total")?.memory_total, "memory_total")
    }

    fn memory_busy_percent(&self, device: DeviceHandle) -> ProviderResult<u32> {
        read(&self.device(device, "memory_busy_percent")?.memory_busy, "memory_busy_percent")
    }

    fn busy_percent(&self, device: DeviceHandle) -> ProviderResult<u32> {
        read(&self.device(device, "busy_percent")?.busy, "busy_percent")
    }

    fn compute_process_ids(&self) -> ProviderResult<Vec<u32>> {
        self.calls.process_list.fetch_add(1, Ordering::SeqCst);
        let listed = self
            .processes
            .as_ref()
            .ok_or(ProviderError::new("compute_process_ids", ProviderStatus::Permission))?;
        if listed.is_empty() {
            return Ok(Vec::new());
        }

        let live: Vec<u32> = listed.iter().chain(&self.late_processes).map(|p| p.pid).collect();
        fetch_sized("compute_process_ids", listed.len(), 0u32, |buffer| {
            let written = live.len().min(buffer.len());
            buffer[..written].copy_from_slice(&live[..written]);
            let status = (written < live.len()).then_some(ProviderStatus::InsufficientSize);
            (status, written)
        })
    }

    fn compute_process_device_count(&self, pid: u32) -> ProviderResult<u32> {
        let process = self.process(pid, "compute_process_device_count")?;
        process
            .devices
            .as_ref()
            .map(|devices| process.reported_device_count.unwrap_or(devices.len() as u32))
            .ok_or(ProviderError::new(
                "compute_process_device_count",
                ProviderStatus::NotFound,
            ))
    }

    fn compute_process_devices(&self, pid: u32, indices: &mut [u32]) -> ProviderResult<usize> {
        self.calls.device_list_fetch.fetch_add(1, Ordering::SeqCst);
        let devices = self
            .process(pid, "compute_process_devices")?
            .devices
            .as_ref()
            .ok_or(ProviderError::new("compute_process_devices", ProviderStatus::NotFound))?;
        let written = devices.len().min(indices.len());
        indices[..written].copy_from_slice(&devices[..written]);
        Ok(written)
    }

    fn compute_process_usage(&self, pid: u32, device: DeviceHandle) -> ProviderResult<RawProcessUsage> {
        self.calls.process_usage.fetch_add(1, Ordering::SeqCst);
        self.process(pid, "compute_process_usage")?
            .usage
            .get(&device.index())
            .copied()
            .ok_or(ProviderError::new("compute_process_usage", ProviderStatus::NotFound))
    }
}

/// Process source answering from a fixed table.
#[derive(Debug, Default)]
pub struct FakeProcessSource {
    pub known: HashMap<u32, ProcessInfo>,
    pub denied: Vec<u32>,
    pub lookups: AtomicUsize,
}

impl FakeProcessSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(mut self, pid: u32, owner: &str, cpu_percent: f32, command: &[&str]) -> Self {
        self.known.insert(
            pid,
            ProcessInfo {
                pid,
                owner: owner.to_string(),
                cpu_percent,
                command_line: command.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_denied(mut self, pid: u32) -> Self {
        self.denied.push(pid);
        self
    }
}

impl ProcessInfoSource for FakeProcessSource {
    fn lookup(&self, pid: u32) -> Result<ProcessInfo, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.denied.contains(&pid) {
            return Err(LookupError::PermissionDenied(pid));
        }
        self.known.get(&pid).cloned().ok_or(LookupError::Vanished(pid))
    }
}
