//! GPU monitor command handler.
//!
//! Resolves the configuration, opens the provider and runs one of the three
//! output modes: the TUI dashboard, a single table, or a JSON stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::config::MonitorConfig;
use crate::core::gpu_monitor::{FrameBuilder, MetricsProvider, MonitorRuntime};
use crate::platform::{open_provider, SysinfoProcessSource};
use crate::ui::monitor_tui::{run_monitor_app, MonitorAppConfig};
use crate::ui::smi_table::{render_frame, RenderOptions};

/// Granularity at which the JSON loop notices Ctrl+C.
const CANCEL_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Tui,
    Once,
    Json,
}

impl OutputMode {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        if matches.get_flag("json") {
            OutputMode::Json
        } else if matches.get_flag("once") {
            OutputMode::Once
        } else {
            OutputMode::Tui
        }
    }
}

/// Execute the monitor command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches)?;
    let mode = OutputMode::from_matches(matches);
    log::debug!("Starting in {:?} mode with {:?}", mode, config);

    let builder = frame_builder(&config)?;

    match mode {
        OutputMode::Tui => run_tui(builder, &config),
        OutputMode::Once => run_once(&builder, &config),
        OutputMode::Json => run_json_output(&builder, &config),
    }
}

/// Config file values overridden by command-line flags.
pub fn resolve_config(matches: &ArgMatches) -> Result<MonitorConfig> {
    let config = apply_overrides(MonitorConfig::load()?, matches);

    if matches.get_flag("save-config") {
        config.save().context("Failed to save configuration")?;
        let path = MonitorConfig::get_config_path()?;
        eprintln!("{} {}", "Saved configuration to".green(), path.display());
    }

    Ok(config)
}

pub fn apply_overrides(mut config: MonitorConfig, matches: &ArgMatches) -> MonitorConfig {
    if let Some(interval) = matches.get_one::<u64>("interval") {
        config.interval_ms = *interval;
    }
    if let Some(window) = matches.get_one::<u64>("cpu-window") {
        config.cpu_sample_window_ms = *window;
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        config.enrich_workers = *workers;
    }
    config.sanitized()
}

type ProductionBuilder = FrameBuilder<Box<dyn MetricsProvider>, SysinfoProcessSource>;

fn frame_builder(config: &MonitorConfig) -> Result<ProductionBuilder> {
    let provider = open_provider()?;
    let source = SysinfoProcessSource::new(config.cpu_sample_window());
    Ok(FrameBuilder::new(provider, source).with_workers(config.enrich_workers))
}

fn render_options(config: &MonitorConfig) -> RenderOptions {
    RenderOptions {
        command_width: config.command_width,
    }
}

fn run_tui(builder: ProductionBuilder, config: &MonitorConfig) -> Result<()> {
    let runtime = MonitorRuntime::start(builder, config.interval())
        .context("Failed to start refresh loop")?;

    let app_config = MonitorAppConfig {
        interval_ms: config.interval_ms,
        command_width: config.command_width,
    };
    run_monitor_app(runtime, app_config).context("Failed to run GPU monitor")
}

fn run_once(builder: &ProductionBuilder, config: &MonitorConfig) -> Result<()> {
    let frame = builder.build().context("Failed to build frame")?;
    for line in render_frame(&frame, &render_options(config)) {
        println!("{}", line);
    }
    Ok(())
}

/// Run in JSON output mode (for scripting)
fn run_json_output(builder: &ProductionBuilder, config: &MonitorConfig) -> Result<()> {
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_flag_clone = cancel_flag.clone();

    ctrlc::set_handler(move || {
        cancel_flag_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let interval = config.interval();
    while !cancel_flag.load(Ordering::Relaxed) {
        let started = Instant::now();

        match builder.build() {
            Ok(frame) => println!("{}", serde_json::to_string(&frame)?),
            Err(e) => log::error!("Frame build failed: {}", e),
        }

        let deadline = started + interval;
        while !cancel_flag.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(CANCEL_POLL.min(deadline - now));
        }
    }

    Ok(())
}
