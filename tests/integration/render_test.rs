use rocm_top::core::gpu_monitor::testing::{FakeDevice, FakeProcess, FakeProcessSource, FakeProvider};
use rocm_top::core::gpu_monitor::{FrameBuilder, RawProcessUsage};
use rocm_top::ui::{bytes_to_mib, render_frame, RenderOptions};

#[test]
fn test_mebibytes_round_down() {
    assert_eq!(bytes_to_mib(17_825_792), 17);
}

#[test]
fn test_end_to_end_table() {
    let provider = FakeProvider::new()
        .with_device(FakeDevice::named("GPU0"))
        .with_device(FakeDevice::named("GPU1"))
        .with_process(FakeProcess::on(
            1234,
            0,
            RawProcessUsage {
                vram_usage: 1_048_576,
                sdma_usage: 0,
                cu_occupancy: 0,
            },
        ));
    let source = FakeProcessSource::new().with_process(1234, "alice", 3.0, &["python", "train.py"]);

    let frame = FrameBuilder::new(provider, source).build().unwrap();
    let lines = render_frame(&frame, &RenderOptions::default());

    assert!(lines.iter().any(|l| l.contains("GPU0")));
    assert!(lines.iter().any(|l| l.contains("GPU1")));

    let header = lines.iter().position(|l| l.starts_with("USER")).unwrap();
    let row = &lines[header + 1];
    assert!(row.starts_with("alice"));
    assert!(row.contains("1234"));
    assert!(row.contains("1MiB"));
    assert!(row.contains("3.0%"));
    assert!(row.ends_with("python train.py"));
    assert_eq!(lines.len(), header + 2);
}

#[test]
fn test_no_gpus_table() {
    let frame = FrameBuilder::new(FakeProvider::new(), FakeProcessSource::new())
        .build()
        .unwrap();
    let lines = render_frame(&frame, &RenderOptions::default());

    assert!(lines.iter().any(|l| l.contains("No GPUs found")));
    assert!(lines.last().unwrap().starts_with("USER"));
}

#[test]
fn test_unknown_owner_rendered() {
    let provider = FakeProvider::new()
        .with_device(FakeDevice::named("GPU0"))
        .with_process(FakeProcess::on(55, 0, RawProcessUsage::default()));

    let frame = FrameBuilder::new(provider, FakeProcessSource::new()).build().unwrap();
    let lines = render_frame(&frame, &RenderOptions::default());

    assert!(lines.last().unwrap().starts_with("UNKNOWN"));
    assert!(lines.last().unwrap().contains("55"));
}
