//! Hardware metrics provider abstraction.
//!
//! The frame pipeline only talks to the GPU through [`MetricsProvider`].
//! The production implementation lives in the platform layer and is backed by
//! the ROCm SMI library; tests use a scripted fake.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::metrics::{DeviceHandle, LibraryVersion, PerformanceLevel};

/// Value reported for CU occupancy when the hardware did not measure it.
pub const CU_OCCUPANCY_INVALID: u32 = 0xFFFF_FFFF;

/// Status codes returned by the provider (mirrors `rsmi_status_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    InvalidArgs,
    NotSupported,
    FileError,
    Permission,
    OutOfResources,
    InternalException,
    InputOutOfBounds,
    InitError,
    NotYetImplemented,
    NotFound,
    InsufficientSize,
    Interrupt,
    UnexpectedSize,
    NoData,
    UnexpectedData,
    Busy,
    RefcountOverflow,
    Unknown(u32),
}

impl ProviderStatus {
    /// Map a raw status code to a status. `0` (success) has no status.
    pub fn from_code(code: u32) -> Option<Self> {
        let status = match code {
            0 => return None,
            1 => Self::InvalidArgs,
            2 => Self::NotSupported,
            3 => Self::FileError,
            4 => Self::Permission,
            5 => Self::OutOfResources,
            6 => Self::InternalException,
            7 => Self::InputOutOfBounds,
            8 => Self::InitError,
            9 => Self::NotYetImplemented,
            10 => Self::NotFound,
            11 => Self::InsufficientSize,
            12 => Self::Interrupt,
            13 => Self::UnexpectedSize,
            14 => Self::NoData,
            15 => Self::UnexpectedData,
            16 => Self::Busy,
            17 => Self::RefcountOverflow,
            other => Self::Unknown(other),
        };
        Some(status)
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgs => write!(f, "invalid arguments"),
            Self::NotSupported => write!(f, "not supported"),
            Self::FileError => write!(f, "file error"),
            Self::Permission => write!(f, "permission denied"),
            Self::OutOfResources => write!(f, "out of resources"),
            Self::InternalException => write!(f, "internal exception"),
            Self::InputOutOfBounds => write!(f, "input out of bounds"),
            Self::InitError => write!(f, "initialization error"),
            Self::NotYetImplemented => write!(f, "not yet implemented"),
            Self::NotFound => write!(f, "not found"),
            Self::InsufficientSize => write!(f, "insufficient size"),
            Self::Interrupt => write!(f, "interrupted"),
            Self::UnexpectedSize => write!(f, "unexpected size"),
            Self::NoData => write!(f, "no data"),
            Self::UnexpectedData => write!(f, "unexpected data"),
            Self::Busy => write!(f, "busy"),
            Self::RefcountOverflow => write!(f, "refcount overflow"),
            Self::Unknown(code) => write!(f, "unknown error ({code:#x})"),
        }
    }
}

/// A failed provider call: which call, and the status it returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{call} returned {status}")]
pub struct ProviderError {
    pub call: &'static str,
    pub status: ProviderStatus,
}

impl ProviderError {
    pub fn new(call: &'static str, status: ProviderStatus) -> Self {
        Self { call, status }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Entries allocated past a reported count, for items that appear between
/// the size query and the fetch.
pub const FETCH_SLACK: usize = 8;

/// Second half of a size-then-fetch query.
///
/// Hands `fetch` a buffer of `count + FETCH_SLACK` entries; it returns the
/// call's status and how many entries it wrote. When the buffer still turns
/// out too small the written entries are kept and the rest are picked up on
/// the next refresh.
pub fn fetch_sized<T: Clone>(
    call: &'static str,
    count: usize,
    empty: T,
    fetch: impl FnOnce(&mut [T]) -> (Option<ProviderStatus>, usize),
) -> ProviderResult<Vec<T>> {
    let mut buffer = vec![empty; count + FETCH_SLACK];
    let (status, written) = fetch(&mut buffer);
    match status {
        None => {}
        Some(ProviderStatus::InsufficientSize) => {
            log::debug!(
                "{} outgrew a buffer of {} entries, keeping the first {}",
                call,
                buffer.len(),
                written
            );
        }
        Some(status) => return Err(ProviderError::new(call, status)),
    }
    buffer.truncate(written.min(buffer.len()));
    Ok(buffer)
}

/// Temperature sensors exposed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureSensor {
    Edge,
    Junction,
    Memory,
}

/// Kind of power figure the device reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerKind {
    Average,
    Current,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
    pub watts: f64,
    pub kind: PowerKind,
}

/// Per-(process, device) usage exactly as the provider reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawProcessUsage {
    pub vram_usage: u64,
    pub sdma_usage: u64,
    pub cu_occupancy: u32,
}

/// Capability interface onto the GPU metrics library.
///
/// Every call is independent: one failing getter says nothing about the
/// others. Implementations are not assumed to be thread-safe; callers
/// serialize access.
pub trait MetricsProvider: Send {
    fn device_count(&self) -> ProviderResult<u32>;

    fn library_version(&self) -> ProviderResult<LibraryVersion>;

    fn device_name(&self, device: DeviceHandle) -> ProviderResult<String>;

    /// Temperature in degrees Celsius.
    fn temperature(&self, device: DeviceHandle, sensor: TemperatureSensor) -> ProviderResult<f64>;

    fn performance_level(&self, device: DeviceHandle) -> ProviderResult<PerformanceLevel>;

    fn power(&self, device: DeviceHandle) -> ProviderResult<PowerReading>;

    /// Power cap in watts.
    fn power_cap(&self, device: DeviceHandle) -> ProviderResult<f64>;

    fn memory_used(&self, device: DeviceHandle) -> ProviderResult<u64>;

    fn memory_total(&self, device: DeviceHandle) -> ProviderResult<u64>;

    fn memory_busy_percent(&self, device: DeviceHandle) -> ProviderResult<u32>;

    fn busy_percent(&self, device: DeviceHandle) -> ProviderResult<u32>;

    /// PIDs currently holding a compute context.
    fn compute_process_ids(&self) -> ProviderResult<Vec<u32>>;

    /// Number of devices `pid` has a compute context on.
    fn compute_process_device_count(&self, pid: u32) -> ProviderResult<u32>;

    /// Fill `indices` with the device indices used by `pid` and return how
    /// many entries were written.
    fn compute_process_devices(&self, pid: u32, indices: &mut [u32]) -> ProviderResult<usize>;

    fn compute_process_usage(&self, pid: u32, device: DeviceHandle) -> ProviderResult<RawProcessUsage>;
}

impl<T: MetricsProvider + ?Sized> MetricsProvider for Box<T> {
    fn device_count(&self) -> ProviderResult<u32> {
        (**self).device_count()
    }

    fn library_version(&self) -> ProviderResult<LibraryVersion> {
        (**self).library_version()
    }

    fn device_name(&self, device: DeviceHandle) -> ProviderResult<String> {
        (**self).device_name(device)
    }

    fn temperature(&self, device: DeviceHandle, sensor: TemperatureSensor) -> ProviderResult<f64> {
        (**self).temperature(device, sensor)
    }

    fn performance_level(&self, device: DeviceHandle) -> ProviderResult<PerformanceLevel> {
        (**self).performance_level(device)
    }

    fn power(&self, device: DeviceHandle) -> ProviderResult<PowerReading> {
        (**self).power(device)
    }

    fn power_cap(&self, device: DeviceHandle) -> ProviderResult<f64> {
        (**self).power_cap(device)
    }

    fn memory_used(&self, device: DeviceHandle) -> ProviderResult<u64> {
        (**self).memory_used(device)
    }

    fn memory_total(&self, device: DeviceHandle) -> ProviderResult<u64> {
        (**self).memory_total(device)
    }

    fn memory_busy_percent(&self, device: DeviceHandle) -> ProviderResult<u32> {
        (**self).memory_busy_percent(device)
    }

    fn busy_percent(&self, device: DeviceHandle) -> ProviderResult<u32> {
        (**self).busy_percent(device)
    }

    fn compute_process_ids(&self) -> ProviderResult<Vec<u32>> {
        (**self).compute_process_ids()
    }

    fn compute_process_device_count(&self, pid: u32) -> ProviderResult<u32> {
        (**self).compute_process_device_count(pid)
    }

    fn compute_process_devices(&self, pid: u32, indices: &mut [u32]) -> ProviderResult<usize> {
        (**self).compute_process_devices(pid, indices)
    }

    fn compute_process_usage(&self, pid: u32, device: DeviceHandle) -> ProviderResult<RawProcessUsage> {
        (**self).compute_process_usage(pid, device)
    }
}
