use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a physical GPU (the provider's device index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceHandle(pub u32);

impl DeviceHandle {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sample of a device. `None` means the counter could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetrics {
    pub device_id: DeviceHandle,
    pub name: Option<String>,
    pub temperature_c: Option<f64>,
    pub performance_level: Option<PerformanceLevel>,
    pub power_watts: Option<f64>,
    pub power_cap_watts: Option<f64>,
    pub memory_used_bytes: Option<u64>,
    pub memory_total_bytes: Option<u64>,
    pub memory_busy_percent: Option<u32>,
    pub utilization_percent: Option<u32>,
}

impl DeviceMetrics {
    /// A sample with every counter unavailable.
    pub fn unavailable(device_id: DeviceHandle) -> Self {
        Self {
            device_id,
            name: None,
            temperature_c: None,
            performance_level: None,
            power_watts: None,
            power_cap_watts: None,
            memory_used_bytes: None,
            memory_total_bytes: None,
            memory_busy_percent: None,
            utilization_percent: None,
        }
    }
}

/// Device performance level (`rsmi_dev_perf_level_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Auto,
    Low,
    High,
    Manual,
    StableStd,
    StablePeak,
    StableMinMclk,
    StableMinSclk,
    Determinism,
    Unknown,
}

impl PerformanceLevel {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Auto,
            1 => Self::Low,
            2 => Self::High,
            3 => Self::Manual,
            4 => Self::StableStd,
            5 => Self::StablePeak,
            6 => Self::StableMinMclk,
            7 => Self::StableMinSclk,
            8 => Self::Determinism,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Low => "low",
            Self::High => "high",
            Self::Manual => "manual",
            Self::StableStd => "stable_std",
            Self::StablePeak => "stable_peak",
            Self::StableMinMclk => "stable_min_mclk",
            Self::StableMinSclk => "stable_min_sclk",
            Self::Determinism => "determinism",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GPU resources held by one compute process, across every device it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGpuUsage {
    pub pid: u32,
    pub device_ids: BTreeSet<DeviceHandle>,
    pub vram_used_bytes: Option<u64>,
    pub dma_usage_bytes: Option<u64>,
    pub cu_occupancy_percent: Option<u32>,
}

impl ProcessGpuUsage {
    /// A process whose attribution could not be read at all.
    pub fn unattributed(pid: u32) -> Self {
        Self {
            pid,
            device_ids: BTreeSet::new(),
            vram_used_bytes: None,
            dma_usage_bytes: None,
            cu_occupancy_percent: None,
        }
    }
}

/// OS-level metadata for a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub owner: String,
    pub cpu_percent: f32,
    pub command_line: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownReason {
    /// The process exited between enumeration and lookup.
    Vanished,
    PermissionDenied,
    LookupFailed,
}

/// Result of enriching a PID with OS metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Enrichment {
    Known(ProcessInfo),
    Unknown { reason: UnknownReason },
}

impl Enrichment {
    /// Owner used for ordering; unknown processes sort as an empty owner.
    pub fn owner(&self) -> &str {
        match self {
            Enrichment::Known(info) => &info.owner,
            Enrichment::Unknown { .. } => "",
        }
    }

    pub fn info(&self) -> Option<&ProcessInfo> {
        match self {
            Enrichment::Known(info) => Some(info),
            Enrichment::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub usage: ProcessGpuUsage,
    pub info: Enrichment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Complete snapshot of devices and compute processes at one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub timestamp: DateTime<Utc>,
    pub tool_version: String,
    pub library_version: Option<LibraryVersion>,
    pub devices: Vec<DeviceMetrics>,
    pub processes: Vec<ProcessEntry>,
}
