use chrono::Utc;
use parking_lot::Mutex;

use crate::error::Result;

use super::attribution::attribute_all;
use super::devices::list_devices;
use super::enrich::{enrich_all, ProcessInfoSource};
use super::metrics::{Frame, ProcessEntry};
use super::provider::MetricsProvider;
use super::sampler::sample;

pub const DEFAULT_ENRICH_WORKERS: usize = 8;

/// Builds complete frames from a metrics provider and a process source.
///
/// Provider calls go through one lock, so at most one is in flight. Only the
/// OS lookups run in parallel.
pub struct FrameBuilder<P, S> {
    provider: Mutex<P>,
    source: S,
    workers: usize,
}

impl<P: MetricsProvider, S: ProcessInfoSource> FrameBuilder<P, S> {
    pub fn new(provider: P, source: S) -> Self {
        Self {
            provider: Mutex::new(provider),
            source,
            workers: DEFAULT_ENRICH_WORKERS,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Build one frame.
    ///
    /// Fails only when the devices cannot be enumerated. Anything that goes
    /// wrong for a single counter or process is recorded in the frame.
    pub fn build(&self) -> Result<Frame> {
        let (library_version, devices, usages) = {
            let provider = self.provider.lock();
            let handles = list_devices(&*provider)?;
            let devices: Vec<_> = handles.iter().map(|h| sample(&*provider, *h)).collect();
            let library_version = provider
                .library_version()
                .map_err(|e| log::debug!("Library version unavailable: {}", e))
                .ok();
            (library_version, devices, attribute_all(&*provider))
        };

        let pids: Vec<u32> = usages.iter().map(|u| u.pid).collect();
        if !pids.is_empty() {
            self.source.begin_cycle();
        }
        let enrichments = enrich_all(&self.source, &pids, self.workers);

        let mut processes: Vec<ProcessEntry> = usages
            .into_iter()
            .zip(enrichments)
            .map(|(usage, info)| ProcessEntry { usage, info })
            .collect();
        sort_processes(&mut processes);

        log::debug!(
            "Built frame: {} device(s), {} compute process(es)",
            devices.len(),
            processes.len()
        );

        Ok(Frame {
            timestamp: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            library_version,
            devices,
            processes,
        })
    }
}

/// Owner ascending (byte order, so case-sensitive and empty first), then pid.
pub fn sort_processes(processes: &mut [ProcessEntry]) {
    processes.sort_by(|a, b| {
        a.info
            .owner()
            .cmp(b.info.owner())
            .then(a.usage.pid.cmp(&b.usage.pid))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gpu_monitor::metrics::{DeviceHandle, Enrichment, ProcessGpuUsage, ProcessInfo};
    use crate::core::gpu_monitor::provider::{ProviderStatus, RawProcessUsage};
    use crate::core::gpu_monitor::testing::{
        FakeDevice, FakeProcess, FakeProcessSource, FakeProvider,
    };
    use crate::error::TopError;

    fn usage(vram: u64) -> RawProcessUsage {
        RawProcessUsage {
            vram_usage: vram,
            sdma_usage: 0,
            cu_occupancy: 0,
        }
    }

    #[test]
    fn test_owner_sorts_before_pid() {
        let provider = FakeProvider::new()
            .with_device(FakeDevice::named("GPU0"))
            .with_process(FakeProcess::on(50, 0, usage(1)))
            .with_process(FakeProcess::on(100, 0, usage(1)));
        let source = FakeProcessSource::new()
            .with_process(100, "alice", 0.0, &["a"])
            .with_process(50, "bob", 0.0, &["b"]);

        let frame = FrameBuilder::new(provider, source).build().unwrap();

        let order: Vec<_> = frame.processes.iter().map(|p| p.usage.pid).collect();
        assert_eq!(order, vec![100, 50]);
    }

    #[test]
    fn test_empty_owner_sorts_first() {
        let provider = FakeProvider::new()
            .with_device(FakeDevice::named("GPU0"))
            .with_process(FakeProcess::on(1, 0, usage(1)))
            .with_process(FakeProcess::on(5, 0, usage(1)));
        let source = FakeProcessSource::new()
            .with_process(1, "alice", 0.0, &["a"])
            .with_process(5, "", 0.0, &["b"]);

        let frame = FrameBuilder::new(provider, source).build().unwrap();

        let order: Vec<_> = frame.processes.iter().map(|p| p.usage.pid).collect();
        assert_eq!(order, vec![5, 1]);
    }

    #[test]
    fn test_owner_sort_is_case_sensitive() {
        let mut entries = vec![
            ProcessEntry {
                usage: ProcessGpuUsage::unattributed(2),
                info: known("alice"),
            },
            ProcessEntry {
                usage: ProcessGpuUsage::unattributed(1),
                info: known("Zed"),
            },
        ];

        sort_processes(&mut entries);

        assert_eq!(entries[0].info.owner(), "Zed");
    }

    fn known(owner: &str) -> Enrichment {
        Enrichment::Known(ProcessInfo {
            pid: 0,
            owner: owner.to_string(),
            cpu_percent: 0.0,
            command_line: Vec::new(),
        })
    }

    #[test]
    fn test_no_devices_builds_empty_frame() {
        let frame = FrameBuilder::new(FakeProvider::new(), FakeProcessSource::new())
            .build()
            .unwrap();

        assert!(frame.devices.is_empty());
        assert!(frame.processes.is_empty());
        assert_eq!(frame.tool_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_enumeration_failure_fails_the_cycle() {
        let mut provider = FakeProvider::new();
        provider.device_count_error = Some(ProviderStatus::InitError);

        let err = FrameBuilder::new(provider, FakeProcessSource::new())
            .build()
            .unwrap_err();

        assert!(matches!(err, TopError::DeviceEnumeration(_)));
    }

    #[test]
    fn test_unenriched_process_stays_visible() {
        let provider = FakeProvider::new()
            .with_device(FakeDevice::named("GPU0"))
            .with_process(FakeProcess::on(77, 0, usage(2048)));

        let frame = FrameBuilder::new(provider, FakeProcessSource::new())
            .build()
            .unwrap();

        assert_eq!(frame.processes.len(), 1);
        assert_eq!(frame.processes[0].usage.pid, 77);
        assert!(frame.processes[0].info.info().is_none());
        assert_eq!(
            frame.processes[0].usage.device_ids.iter().next(),
            Some(&DeviceHandle(0))
        );
    }

    #[test]
    fn test_broken_device_does_not_block_others() {
        let provider = FakeProvider::new()
            .with_device(FakeDevice::broken())
            .with_device(FakeDevice::named("GPU1"));

        let frame = FrameBuilder::new(provider, FakeProcessSource::new())
            .build()
            .unwrap();

        assert_eq!(frame.devices.len(), 2);
        assert_eq!(frame.devices[0].name, None);
        assert_eq!(frame.devices[1].name.as_deref(), Some("GPU1"));
        assert_eq!(frame.devices[1].utilization_percent, Some(12));
    }
}
