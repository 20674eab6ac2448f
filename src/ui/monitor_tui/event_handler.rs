use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Events that can occur in the monitor TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Quit the application
    Quit,
    /// Scroll the table up one line
    ScrollUp,
    /// Scroll the table down one line
    ScrollDown,
    /// Jump back to the top of the table
    ScrollHome,
    /// No action
    None,
}

impl MonitorEvent {
    pub fn from_key(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => MonitorEvent::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                MonitorEvent::Quit
            }
            KeyCode::Up | KeyCode::Char('k') => MonitorEvent::ScrollUp,
            KeyCode::Down | KeyCode::Char('j') => MonitorEvent::ScrollDown,
            KeyCode::Home | KeyCode::Char('g') => MonitorEvent::ScrollHome,
            _ => MonitorEvent::None,
        }
    }
}
