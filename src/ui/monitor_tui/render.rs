use ratatui::{
    prelude::*,
    widgets::Paragraph,
};

use super::app::MonitorApp;
use crate::core::gpu_monitor::Snapshot;
use crate::ui::smi_table::render_frame;

/// Main render function
pub fn render_ui(frame: &mut Frame, app: &MonitorApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let snapshot = app.runtime.snapshot();

    let body = match &snapshot.frame {
        Some(gpu_frame) => {
            let lines: Vec<Line> = render_frame(gpu_frame, &app.render_options)
                .into_iter()
                .map(Line::from)
                .collect();
            Paragraph::new(lines).scroll((app.scroll, 0))
        }
        None => Paragraph::new(Line::from("Collecting first frame...".dark_gray())),
    };
    frame.render_widget(body, chunks[0]);

    frame.render_widget(Paragraph::new(status_line(app, &snapshot)), chunks[1]);
}

fn status_line(app: &MonitorApp, snapshot: &Snapshot) -> Line<'static> {
    let mut spans = vec![
        Span::styled(" q", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::raw(" quit  "),
        Span::styled("↑↓", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::raw(" scroll  "),
        Span::raw(format!("every {}ms", app.interval_ms)).dark_gray(),
    ];

    if let Some(frame) = &snapshot.frame {
        spans.push(Span::raw(format!("  updated {}", frame.timestamp.format("%H:%M:%S"))).dark_gray());
    }
    if snapshot.skipped_cycles > 0 {
        spans.push(Span::raw(format!("  skipped {}", snapshot.skipped_cycles)).yellow());
    }
    if let Some(err) = &snapshot.last_error {
        spans.push(Span::raw(format!("  {}", err)).red());
    }

    Line::from(spans)
}
