use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::core::gpu_monitor::MonitorRuntime;
use crate::ui::smi_table::RenderOptions;

use super::event_handler::MonitorEvent;
use super::render::render_ui;

/// How often the screen is redrawn and keys are polled.
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Monitor application state
pub struct MonitorApp {
    pub runtime: MonitorRuntime,
    pub render_options: RenderOptions,
    pub interval_ms: u64,
    pub scroll: u16,
    pub should_quit: bool,
}

impl MonitorApp {
    pub fn new(runtime: MonitorRuntime, config: MonitorAppConfig) -> Self {
        Self {
            runtime,
            render_options: RenderOptions {
                command_width: config.command_width,
            },
            interval_ms: config.interval_ms,
            scroll: 0,
            should_quit: false,
        }
    }

    /// Handle keyboard events
    pub fn handle_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::Quit => self.should_quit = true,
            MonitorEvent::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            MonitorEvent::ScrollDown => self.scroll = self.scroll.saturating_add(1),
            MonitorEvent::ScrollHome => self.scroll = 0,
            MonitorEvent::None => {}
        }
    }
}

/// Configuration for the monitor app
#[derive(Debug, Clone)]
pub struct MonitorAppConfig {
    pub interval_ms: u64,
    pub command_width: usize,
}

/// Run the monitor TUI application until the user quits.
pub fn run_monitor_app(runtime: MonitorRuntime, config: MonitorAppConfig) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut terminal = setup_or_restore(enter_terminal, leave_terminal)?;

    let mut app = MonitorApp::new(runtime, config);
    let result = event_loop(&mut terminal, &mut app);

    // Restore terminal even if the loop failed
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    app.runtime.shutdown();
    result
}

/// Finish terminal setup once raw mode is on, running `restore` if it fails.
fn setup_or_restore<T>(setup: impl FnOnce() -> Result<T>, restore: impl FnOnce()) -> Result<T> {
    match setup() {
        Ok(value) => Ok(value),
        Err(e) => {
            restore();
            Err(e)
        }
    }
}

fn enter_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

/// Best-effort undo of a partial setup.
fn leave_terminal() {
    if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
        log::debug!("Failed to leave alternate screen: {}", e);
    }
    if let Err(e) = disable_raw_mode() {
        log::warn!("Failed to disable raw mode: {}", e);
    }
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut MonitorApp,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render_ui(frame, app))?;

        if event::poll(REDRAW_INTERVAL).context("Event poll failed")? {
            if let Event::Key(key) = event::read().context("Event read failed")? {
                if key.kind == KeyEventKind::Press {
                    app.handle_event(MonitorEvent::from_key(key));
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_failed_setup_restores_terminal() {
        let restored = Cell::new(false);
        let result: Result<()> = setup_or_restore(
            || Err(anyhow::anyhow!("Failed to create terminal")),
            || restored.set(true),
        );

        assert!(result.is_err());
        assert!(restored.get());
    }

    #[test]
    fn test_successful_setup_keeps_terminal() {
        let restored = Cell::new(false);
        let result = setup_or_restore(|| Ok(7), || restored.set(true));

        assert_eq!(result.unwrap(), 7);
        assert!(!restored.get());
    }
}
