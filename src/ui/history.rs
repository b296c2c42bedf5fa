use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use time_humanize::HumanTime;

use lineflow::{
    history::HistorySummary, recorder::SessionRecord, session::ImageSet, util::format_duration,
};

use crate::App;

/// "3 minutes ago" style label for a record date.
pub fn relative_date(date: DateTime<Local>, now: DateTime<Local>) -> String {
    let secs = (date - now).num_seconds().min(0);
    if secs > -60 {
        return "just now".to_string();
    }
    HumanTime::from_seconds(secs).to_string()
}

/// Pure presenter for a single history row
pub fn present_row(record: &SessionRecord, now: DateTime<Local>) -> Row<'static> {
    let set_style = match record.image_set {
        ImageSet::Ai => Style::default().fg(Color::Magenta),
        ImageSet::Custom => Style::default().fg(Color::Cyan),
    };

    Row::new(vec![
        Cell::from(relative_date(record.date, now)),
        Cell::from(record.mode.title()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format_duration(record.total_duration_secs)),
        Cell::from(record.images_completed.to_string()),
        Cell::from(record.image_set.to_string()).style(set_style),
    ])
}

fn summary_line(summary: &HistorySummary) -> String {
    let mut line = format!(
        "{} sessions  ·  {} practised  ·  {} images",
        summary.sessions,
        format_duration(summary.total_secs),
        summary.total_images
    );
    if let Some(mean) = summary.mean_session_secs {
        line.push_str(&format!("  ·  {} average", format_duration(mean.round() as u64)));
    }
    if let Some(mode) = summary.favourite_mode() {
        line.push_str(&format!("  ·  mostly {}", mode.title()));
    }
    line
}

/// Render the session history screen
pub fn render_history(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let now = Local::now();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Session table
            Constraint::Length(2), // Status + instructions
        ])
        .split(area);

    let records = &app.history_state.records;
    let summary = HistorySummary::from_records(records);

    let title = Paragraph::new(summary_line(&summary))
        .block(Block::default().borders(Borders::ALL).title("History"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if records.is_empty() {
        let no_data = Paragraph::new("No sessions recorded yet. Finish or reset a session to log it.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        // Calculate scrolling bounds
        let table_height = chunks[1].height.saturating_sub(3) as usize; // borders + header
        let max_scroll = records.len().saturating_sub(table_height);
        if app.history_state.scroll_offset > max_scroll {
            app.history_state.scroll_offset = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("When"),
            Cell::from("Mode"),
            Cell::from("Duration"),
            Cell::from("Images"),
            Cell::from("Set"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let visible_rows: Vec<Row> = app
            .history_state
            .records
            .iter()
            .skip(app.history_state.scroll_offset)
            .take(table_height)
            .map(|r| present_row(r, now))
            .collect();

        let widths = [
            Constraint::Min(16),    // When
            Constraint::Length(12), // Mode
            Constraint::Length(10), // Duration
            Constraint::Length(8),  // Images
            Constraint::Length(8),  // Set
        ];

        let table = Table::new(visible_rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Sessions"))
            .column_spacing(2);

        f.render_widget(table, chunks[1]);
    }

    let footer = match &app.status {
        Some(status) => format!("{status}\n(↑/↓) scroll  (Home) top  (x) clear history  (h/esc) back"),
        None => "\n(↑/↓) scroll  (Home) top  (x) clear history  (h/esc) back".to_string(),
    };
    let instructions = Paragraph::new(footer)
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}
