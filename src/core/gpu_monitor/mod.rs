//! GPU monitoring core.
//!
//! Enumerates devices, samples their counters, attributes compute processes
//! to devices, enriches them with OS metadata and merges the lot into one
//! immutable [`Frame`] per refresh.

mod attribution;
mod devices;
mod enrich;
mod frame;
mod metrics;
mod provider;
mod runtime;
mod sampler;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use attribution::{
    attribute, attribute_all, devices_for, list_compute_processes, usage_on, DeviceProcessUsage,
};
pub use devices::list_devices;
pub use enrich::{enrich, enrich_all, LookupError, ProcessInfoSource};
pub use frame::{sort_processes, FrameBuilder, DEFAULT_ENRICH_WORKERS};
pub use metrics::{
    DeviceHandle, DeviceMetrics, Enrichment, Frame, LibraryVersion, PerformanceLevel,
    ProcessEntry, ProcessGpuUsage, ProcessInfo, UnknownReason,
};
pub use provider::{
    fetch_sized, MetricsProvider, PowerKind, PowerReading, ProviderError, ProviderResult,
    ProviderStatus, RawProcessUsage, TemperatureSensor, CU_OCCUPANCY_INVALID, FETCH_SLACK,
};
pub use runtime::{MonitorRuntime, Snapshot};
pub use sampler::sample;
