use std::collections::BTreeSet;

use rocm_top::core::gpu_monitor::testing::{FakeDevice, FakeProcess, FakeProcessSource, FakeProvider};
use rocm_top::core::gpu_monitor::{
    DeviceHandle, Enrichment, FrameBuilder, RawProcessUsage, UnknownReason, CU_OCCUPANCY_INVALID,
};

fn vram(bytes: u64) -> RawProcessUsage {
    RawProcessUsage {
        vram_usage: bytes,
        sdma_usage: 0,
        cu_occupancy: CU_OCCUPANCY_INVALID,
    }
}

#[test]
fn test_two_devices_one_process() {
    let provider = FakeProvider::new()
        .with_device(FakeDevice::named("GPU0"))
        .with_device(FakeDevice::named("GPU1"))
        .with_process(FakeProcess::on(1234, 0, vram(1_048_576)));
    let source = FakeProcessSource::new().with_process(1234, "alice", 5.0, &["python", "train.py"]);

    let frame = FrameBuilder::new(provider, source).build().unwrap();

    assert_eq!(frame.devices.len(), 2);
    assert_eq!(frame.devices[0].name.as_deref(), Some("GPU0"));
    assert_eq!(frame.devices[1].name.as_deref(), Some("GPU1"));
    assert_eq!(frame.processes.len(), 1);

    let entry = &frame.processes[0];
    assert_eq!(entry.usage.pid, 1234);
    assert_eq!(entry.usage.device_ids, BTreeSet::from([DeviceHandle(0)]));
    assert_eq!(entry.usage.vram_used_bytes, Some(1_048_576));
    assert_eq!(entry.usage.cu_occupancy_percent, None);
    assert_eq!(entry.info.owner(), "alice");
}

#[test]
fn test_process_on_both_devices() {
    let provider = FakeProvider::new()
        .with_device(FakeDevice::named("GPU0"))
        .with_device(FakeDevice::named("GPU1"))
        .with_process(
            FakeProcess::on(42, 0, vram(1_048_576)).with_device(
                1,
                RawProcessUsage {
                    vram_usage: 2_097_152,
                    sdma_usage: 4096,
                    cu_occupancy: 40,
                },
            ),
        );
    let source = FakeProcessSource::new().with_process(42, "bob", 0.0, &["hip_app"]);

    let frame = FrameBuilder::new(provider, source).build().unwrap();
    let usage = &frame.processes[0].usage;

    assert_eq!(usage.device_ids, BTreeSet::from([DeviceHandle(0), DeviceHandle(1)]));
    assert_eq!(usage.vram_used_bytes, Some(3_145_728));
    assert_eq!(usage.dma_usage_bytes, Some(4096));
    assert_eq!(usage.cu_occupancy_percent, Some(40));
}

#[test]
fn test_vanished_and_denied_processes_stay_in_frame() {
    let provider = FakeProvider::new()
        .with_device(FakeDevice::named("GPU0"))
        .with_process(FakeProcess::on(10, 0, vram(0)))
        .with_process(FakeProcess::on(20, 0, vram(0)))
        .with_process(FakeProcess::on(30, 0, vram(0)));
    let source = FakeProcessSource::new()
        .with_process(10, "carol", 1.0, &["a"])
        .with_denied(20);

    let frame = FrameBuilder::new(provider, source).build().unwrap();
    let pids: Vec<u32> = frame.processes.iter().map(|p| p.usage.pid).collect();

    // Unknown owners sort as empty, ahead of known users, then by pid
    assert_eq!(pids, vec![20, 30, 10]);
    assert_eq!(
        frame.processes[0].info,
        Enrichment::Unknown {
            reason: UnknownReason::PermissionDenied
        }
    );
    assert_eq!(
        frame.processes[1].info,
        Enrichment::Unknown {
            reason: UnknownReason::Vanished
        }
    );
}

#[test]
fn test_frame_serializes_to_json() {
    let provider = FakeProvider::new()
        .with_device(FakeDevice::named("GPU0"))
        .with_process(FakeProcess::on(7, 0, vram(1024)));
    let source = FakeProcessSource::new().with_process(7, "dave", 2.5, &["rocminfo"]);

    let frame = FrameBuilder::new(provider, source).build().unwrap();
    let json: serde_json::Value = serde_json::to_value(&frame).unwrap();

    assert_eq!(json["devices"][0]["name"], "GPU0");
    assert_eq!(json["processes"][0]["usage"]["pid"], 7);
    assert_eq!(json["processes"][0]["info"]["state"], "known");
    assert_eq!(json["processes"][0]["info"]["owner"], "dave");
    assert_eq!(json["library_version"]["major"], 6);
}
