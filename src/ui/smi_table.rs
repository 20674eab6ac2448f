//! Fixed-width text rendering of a [`Frame`], in the layout of `rocm-smi`.

use crate::core::gpu_monitor::{DeviceMetrics, Enrichment, Frame, ProcessEntry};

use unicode_width::UnicodeWidthStr;

use super::formatters::{
    center, format_cpu_percent, format_mib, format_percent, format_power, format_power_cap,
    format_temperature, pad_left, pad_right, truncate, NOT_AVAILABLE,
};

/// Device table column widths: ID, name, temp, perf, power, memory, util.
const DEVICE_COLUMNS: [usize; 7] = [4, 20, 10, 7, 20, 30, 9];
const INNER_WIDTH: usize = 100;

const USER_WIDTH: usize = 15;
const PID_WIDTH: usize = 10;
/// Minimum GPU column width; it grows to fit the longest device list.
const GPU_WIDTH: usize = 4;
const GPU_MEMORY_WIDTH: usize = 12;
const CPU_WIDTH: usize = 14;

/// Owner shown for processes that could not be enriched.
pub const UNKNOWN_OWNER: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Maximum characters of the command line.
    pub command_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { command_width: 100 }
    }
}

/// Render the device box followed by the process table.
pub fn render_frame(frame: &Frame, options: &RenderOptions) -> Vec<String> {
    let mut lines = Vec::with_capacity(6 + frame.devices.len() * 2 + frame.processes.len());

    lines.push(format!("╒{}╕", "═".repeat(INNER_WIDTH)));
    let library = frame
        .library_version
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    lines.push(boxed(&pad_right(
        &format!(
            " rocm-top version: {}   ROCM-SMI-LIB version: {}",
            frame.tool_version, library
        ),
        INNER_WIDTH,
    )));
    lines.push(separator());
    lines.push(boxed(&device_header()));
    lines.push(separator());

    if frame.devices.is_empty() {
        lines.push(boxed(&center("No GPUs found", INNER_WIDTH)));
    } else {
        for (i, device) in frame.devices.iter().enumerate() {
            if i > 0 {
                lines.push(separator());
            }
            lines.push(boxed(&device_row(device)));
        }
    }
    lines.push(format!("╘{}╛", "═".repeat(INNER_WIDTH)));

    let device_lists: Vec<String> = frame.processes.iter().map(device_list).collect();
    let gpu_width = device_lists
        .iter()
        .map(|list| list.width() + 1)
        .fold(GPU_WIDTH, usize::max);

    lines.push(process_header(gpu_width));
    lines.extend(
        frame
            .processes
            .iter()
            .zip(&device_lists)
            .map(|(p, devices)| process_row(p, devices, gpu_width, options)),
    );

    lines
}

fn boxed(inner: &str) -> String {
    format!("│{}│", inner)
}

fn separator() -> String {
    boxed(&"─".repeat(INNER_WIDTH))
}

fn device_header() -> String {
    let [id, name, temp, perf, power, memory, util] = DEVICE_COLUMNS;
    // "Memory-Usage" takes one column from "GPU-Util" in the header only.
    [
        center("ID", id),
        center("DeviceName", name),
        center("Temp", temp),
        center("Perf", perf),
        center("Pwr:Usage/Cap", power),
        center("Memory-Usage", memory + 1),
        center("GPU-Util", util - 1),
    ]
    .concat()
}

fn device_row(device: &DeviceMetrics) -> String {
    let [id, name, temp, perf, power, memory, util] = DEVICE_COLUMNS;

    let device_name = device.name.as_deref().unwrap_or(NOT_AVAILABLE);
    let perf_level = device
        .performance_level
        .map(|level| level.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let power_cell = format!(
        "{} / {}",
        format_power(device.power_watts),
        format_power_cap(device.power_cap_watts)
    );
    let memory_cell = format!(
        "{} / {}{}",
        pad_left(&format_mib(device.memory_used_bytes), 9),
        pad_left(&format!("{} ", format_mib(device.memory_total_bytes)), 9),
        pad_left(&format_percent(device.memory_busy_percent), 4),
    );

    [
        center(&device.device_id.to_string(), id),
        center(&truncate(device_name, name), name),
        center(&format_temperature(device.temperature_c), temp),
        center(&truncate(&perf_level, perf), perf),
        center(&power_cell, power),
        center(&memory_cell, memory),
        center(&format_percent(device.utilization_percent), util),
    ]
    .concat()
}

fn process_header(gpu_width: usize) -> String {
    [
        pad_right("USER", USER_WIDTH),
        pad_right("PID", PID_WIDTH),
        pad_right("GPU", gpu_width),
        pad_right("GPU MEMORY", GPU_MEMORY_WIDTH),
        pad_right("CPU USAGE", CPU_WIDTH),
        "COMMAND".to_string(),
    ]
    .concat()
}

/// Comma-separated device indices, or `N/A` when none are known.
fn device_list(entry: &ProcessEntry) -> String {
    if entry.usage.device_ids.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    entry
        .usage
        .device_ids
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn process_row(
    entry: &ProcessEntry,
    devices: &str,
    gpu_width: usize,
    options: &RenderOptions,
) -> String {
    let (owner, cpu, command) = match &entry.info {
        Enrichment::Known(info) => (
            info.owner.as_str(),
            format_cpu_percent(Some(info.cpu_percent)),
            truncate(&info.command_line.join(" "), options.command_width),
        ),
        Enrichment::Unknown { .. } => (UNKNOWN_OWNER, NOT_AVAILABLE.to_string(), String::new()),
    };

    [
        pad_right(&truncate(owner, USER_WIDTH - 1), USER_WIDTH),
        pad_right(&entry.usage.pid.to_string(), PID_WIDTH),
        pad_right(devices, gpu_width),
        pad_right(&format_mib(entry.usage.vram_used_bytes), GPU_MEMORY_WIDTH),
        pad_right(&cpu, CPU_WIDTH),
        command,
    ]
    .concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gpu_monitor::{
        DeviceHandle, LibraryVersion, PerformanceLevel, ProcessGpuUsage, ProcessInfo,
        UnknownReason,
    };
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn frame(devices: Vec<DeviceMetrics>, processes: Vec<ProcessEntry>) -> Frame {
        Frame {
            timestamp: Utc::now(),
            tool_version: "0.1.0".to_string(),
            library_version: Some(LibraryVersion {
                major: 6,
                minor: 1,
                patch: 2,
            }),
            devices,
            processes,
        }
    }

    fn full_device(id: u32) -> DeviceMetrics {
        DeviceMetrics {
            device_id: DeviceHandle(id),
            name: Some("Radeon RX 7900 XTX".to_string()),
            temperature_c: Some(45.0),
            performance_level: Some(PerformanceLevel::Auto),
            power_watts: Some(35.0),
            power_cap_watts: Some(327.0),
            memory_used_bytes: Some(17_825_792),
            memory_total_bytes: Some(25_753_026_560),
            memory_busy_percent: Some(3),
            utilization_percent: Some(12),
        }
    }

    fn usage(pid: u32, device: u32, vram: u64) -> ProcessGpuUsage {
        ProcessGpuUsage {
            pid,
            device_ids: BTreeSet::from([DeviceHandle(device)]),
            vram_used_bytes: Some(vram),
            dma_usage_bytes: Some(0),
            cu_occupancy_percent: None,
        }
    }

    #[test]
    fn test_box_lines_share_one_width() {
        let lines = render_frame(&frame(vec![full_device(0), full_device(1)], vec![]), &RenderOptions::default());
        let box_lines: Vec<_> = lines.iter().take_while(|l| !l.starts_with("USER")).collect();

        assert!(box_lines[0].starts_with('╒'));
        assert!(box_lines.last().unwrap().starts_with('╘'));
        for line in &box_lines {
            assert_eq!(line.width(), INNER_WIDTH + 2, "{line}");
        }
    }

    #[test]
    fn test_header_shows_versions() {
        let lines = render_frame(&frame(vec![], vec![]), &RenderOptions::default());
        assert!(lines[1].contains("rocm-top version: 0.1.0"));
        assert!(lines[1].contains("ROCM-SMI-LIB version: 6.1.2"));
    }

    #[test]
    fn test_device_row_values() {
        let lines = render_frame(&frame(vec![full_device(0)], vec![]), &RenderOptions::default());
        let row = &lines[5];

        assert!(row.contains("Radeon RX 7900 XTX"));
        assert!(row.contains("45.0°C"));
        assert!(row.contains("auto"));
        assert!(row.contains("35.0W / 327W"));
        assert!(row.contains("17MiB /"));
        assert!(row.contains("24560MiB"));
        assert!(row.contains("12%"));
    }

    #[test]
    fn test_unreadable_device_renders_placeholders() {
        let lines = render_frame(
            &frame(vec![DeviceMetrics::unavailable(DeviceHandle(0))], vec![]),
            &RenderOptions::default(),
        );
        let row = &lines[5];

        assert!(row.contains("N/A / N/A"));
        assert!(!row.contains("°C"));
        assert_eq!(row.width(), INNER_WIDTH + 2);
    }

    #[test]
    fn test_empty_device_list() {
        let lines = render_frame(&frame(vec![], vec![]), &RenderOptions::default());

        assert!(lines[5].contains("No GPUs found"));
        assert!(lines[6].starts_with('╘'));
        assert!(lines[7].starts_with("USER"));
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_process_rows() {
        let known = ProcessEntry {
            usage: usage(1234, 0, 1_048_576),
            info: Enrichment::Known(ProcessInfo {
                pid: 1234,
                owner: "alice".to_string(),
                cpu_percent: 12.5,
                command_line: vec!["python".to_string(), "train.py".to_string()],
            }),
        };
        let unknown = ProcessEntry {
            usage: usage(99, 1, 0),
            info: Enrichment::Unknown {
                reason: UnknownReason::Vanished,
            },
        };

        let lines = render_frame(&frame(vec![], vec![known, unknown]), &RenderOptions::default());
        let rows = &lines[lines.len() - 2..];

        assert!(rows[0].starts_with("alice          1234      0   1MiB        12.5%         python train.py"));
        assert!(rows[1].starts_with("UNKNOWN        99        1   0MiB        N/A"));
    }

    #[test]
    fn test_many_gpus_keep_columns_aligned() {
        let wide = ProcessEntry {
            usage: ProcessGpuUsage {
                device_ids: (0..4).map(DeviceHandle).collect(),
                ..usage(10, 0, 1_048_576)
            },
            info: Enrichment::Unknown {
                reason: UnknownReason::Vanished,
            },
        };
        let narrow = ProcessEntry {
            usage: usage(11, 2, 2_097_152),
            info: Enrichment::Unknown {
                reason: UnknownReason::Vanished,
            },
        };

        let lines = render_frame(&frame(vec![], vec![wide, narrow]), &RenderOptions::default());
        let table = &lines[lines.len() - 3..];
        let memory_column = table[0].find("GPU MEMORY").unwrap();

        assert!(table[1].contains("0,1,2,3 "));
        assert_eq!(table[1].find("1MiB"), Some(memory_column));
        assert_eq!(table[2].find("2MiB"), Some(memory_column));
    }

    #[test]
    fn test_long_owner_does_not_shift_pid() {
        let entry = ProcessEntry {
            usage: usage(77, 0, 0),
            info: Enrichment::Known(ProcessInfo {
                pid: 77,
                owner: "a-very-long-service-account".to_string(),
                cpu_percent: 0.0,
                command_line: vec![],
            }),
        };
        let lines = render_frame(&frame(vec![], vec![entry]), &RenderOptions::default());

        assert_eq!(lines.last().unwrap().find("77"), Some(USER_WIDTH));
    }

    #[test]
    fn test_command_truncated() {
        let entry = ProcessEntry {
            usage: usage(1, 0, 0),
            info: Enrichment::Known(ProcessInfo {
                pid: 1,
                owner: "bob".to_string(),
                cpu_percent: 0.0,
                command_line: vec!["a".repeat(300)],
            }),
        };
        let lines = render_frame(&frame(vec![], vec![entry]), &RenderOptions { command_width: 10 });

        assert!(lines.last().unwrap().ends_with(&format!(" {}", "a".repeat(10))));
    }
}
