pub mod history;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Widget, Wrap},
};
use webbrowser::Browser;

use lineflow::{
    clock::{DisplayPhase, RunState},
    pool::SlotState,
    session::PracticeMode,
    util::{format_duration, truncate_to_width},
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const POOL_LINES: u16 = 6;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let practice = &self.practice;
        let state = practice.state();
        let config = practice.config();

        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),              // header
                Constraint::Min(0),                 // padding
                Constraint::Length(1),              // image or idle message
                Constraint::Length(1),              // timer
                Constraint::Length(1),              // gauge
                Constraint::Length(1),              // position
                Constraint::Min(0),                 // padding
                Constraint::Length(POOL_LINES + 2), // pool
                Constraint::Length(1),              // status
                Constraint::Length(1),              // legend
            ])
            .split(area);
        let width = chunks[2].width as usize;

        let header = Paragraph::new(Line::from(vec![
            Span::styled(config.mode.title(), bold_style),
            Span::styled(format!("  ·  {}", state.run_state), dim_style),
        ]))
        .alignment(Alignment::Center);
        header.render(chunks[0], buf);

        let main_line = match state.run_state {
            RunState::Idle => Span::styled(
                truncate_to_width(&idle_message(self), width),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::ITALIC),
            ),
            RunState::Generating => Span::styled("Generating images", bold_style),
            RunState::Finished => Span::styled(
                "Session finished - press space to start again",
                bold_style,
            ),
            RunState::Running | RunState::Paused => {
                let name = match state.phase {
                    DisplayPhase::Image => practice
                        .current_image()
                        .map(|i| i.display_name().to_string())
                        .unwrap_or_default(),
                    DisplayPhase::Interval => {
                        let order = practice.clock().order();
                        let next = order
                            .get((state.current_index + 1) % order.len().max(1))
                            .map(|i| i.display_name())
                            .unwrap_or_default();
                        format!("Rest - next up: {}", next)
                    }
                };
                if state.run_state == RunState::Paused {
                    Span::styled(
                        truncate_to_width(&format!("PAUSED - {}", name), width),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )
                } else if state.phase == DisplayPhase::Interval {
                    Span::styled(
                        truncate_to_width(&name, width),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
                    )
                } else {
                    Span::styled(truncate_to_width(&name, width), green_bold_style)
                }
            }
        };
        Paragraph::new(main_line)
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        if state.run_state.is_active() {
            let timer = if config.mode.is_timed() {
                format_duration(u64::from(state.time_remaining))
            } else {
                "untimed".to_string()
            };
            Paragraph::new(Span::styled(timer, bold_style))
                .alignment(Alignment::Center)
                .render(chunks[3], buf);

            if config.mode.is_timed() {
                Gauge::default()
                    .gauge_style(Style::default().fg(Color::Magenta))
                    .ratio(state.progress(config.interval_secs).clamp(0.0, 1.0))
                    .label("")
                    .render(chunks[4], buf);
            }

            let position = format!(
                "image {} of {}",
                state.current_index + 1,
                practice.clock().order().len()
            );
            Paragraph::new(Span::styled(position, dim_style))
                .alignment(Alignment::Center)
                .render(chunks[5], buf);
        } else if let Some(progress) = practice.generation() {
            Gauge::default()
                .gauge_style(Style::default().fg(Color::Magenta))
                .percent(progress.percent())
                .label(format!("{}/{}", progress.finished(), progress.requested))
                .render(chunks[4], buf);
        }

        render_pool(self, chunks[7], buf);

        if let Some(status) = &self.status {
            Paragraph::new(Span::styled(
                status.as_str(),
                Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
            ))
            .render(chunks[8], buf);
        }

        let legend = if state.run_state.is_active() {
            if Browser::is_available() {
                "(space) pause / (←/→) seek / (r)eset / (o)pen / (d)rop / (q)uit"
            } else {
                "(space) pause / (←/→) seek / (r)eset / (d)rop / (q)uit"
            }
        } else {
            "(space) start / (m)ode / (g)enerate / (c)lear / (h)istory / (q)uit"
        };
        Paragraph::new(Span::styled(legend, italic_style)).render(chunks[9], buf);
    }
}

fn idle_message(app: &App) -> String {
    let practice = &app.practice;
    let config = practice.config();
    let ready = practice.pool().ready_count();

    if ready == 0 {
        return if config.mode.is_generative() {
            "IDLE - press (g) to generate images".to_string()
        } else {
            "IDLE - pass image files or folders on the command line".to_string()
        };
    }

    let plan = match config.mode {
        PracticeMode::Precision | PracticeMode::Speed => {
            let preview = practice.preview();
            match (preview.first_secs, preview.last_secs) {
                (Some(first), Some(last)) => format!(
                    "{} of {} images, {}s → {}s",
                    preview.images_used, preview.images_available, first, last
                ),
                _ => format!("{} images", preview.images_available),
            }
        }
        PracticeMode::Zen => format!("{} images, untimed", ready),
        _ if config.interval_secs > 0 => format!(
            "{} images, {} each, {} rest",
            ready,
            format_duration(u64::from(config.fixed_duration())),
            format_duration(u64::from(config.interval_secs))
        ),
        _ => format!(
            "{} images, {} each",
            ready,
            format_duration(u64::from(config.fixed_duration()))
        ),
    };
    format!("IDLE - {} - press space to start", plan)
}

fn render_pool(app: &App, area: Rect, buf: &mut Buffer) {
    let pool = app.practice.pool();
    let current = app.practice.current_image();

    let items: Vec<ListItem> = pool
        .slots()
        .iter()
        .take(POOL_LINES as usize)
        .map(|slot| match &slot.state {
            SlotState::Pending => ListItem::new(Span::styled(
                "… generating",
                Style::default().add_modifier(Modifier::DIM),
            )),
            SlotState::Ready(image) => {
                let style = if Some(image) == current {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Span::styled(image.display_name().to_string(), style))
            }
        })
        .collect();

    let hidden = pool.len().saturating_sub(POOL_LINES as usize);
    let title = if hidden > 0 {
        format!(" Pool ({}, {} more) ", pool.len(), hidden)
    } else {
        format!(" Pool ({}) ", pool.len())
    };

    List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .render(area, buf);
}

/// Dialog shown over the practice screen when a session finishes.
pub fn render_summary(app: &App, area: Rect, buf: &mut Buffer) {
    app.render(area, buf);

    let Some(record) = app.practice.last_record() else {
        return;
    };

    let [dialog] = Layout::vertical([Constraint::Length(8)])
        .flex(Flex::Center)
        .areas(area);
    let [dialog] = Layout::horizontal([Constraint::Length(44)])
        .flex(Flex::Center)
        .areas(dialog);

    Clear.render(dialog, buf);

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let text = vec![
        Line::from(Span::styled(record.mode.title(), bold_style)),
        Line::from(""),
        Line::from(format!(
            "{} practised, {} images",
            format_duration(record.total_duration_secs),
            record.images_completed
        )),
        Line::from(""),
        Line::from(Span::styled(
            "(enter) continue",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];

    Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Session complete ")
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(Color::Green)),
        )
        .render(dialog, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};
    use lineflow::{
        alert::Silent, clock::ClockEvent, config::Config, history::MemoryHistoryStore,
        pool::ImageRef,
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn create_test_app(config: Config, images: usize) -> App {
        let mut app = App::new(
            config,
            Box::new(MemoryHistoryStore::new()),
            Box::new(Silent),
            StdRng::seed_from_u64(1),
        );
        app.practice
            .add_images((0..images).map(|i| ImageRef::new(format!("/refs/pose-{i}.png"))));
        app
    }

    fn render(app: &App, w: u16, h: u16) -> String {
        let area = Rect::new(0, 0, w, h);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_ui_constants() {
        assert_eq!(HORIZONTAL_MARGIN, 5);
        assert_eq!(VERTICAL_MARGIN, 2);
    }

    #[test]
    fn test_idle_without_images() {
        let app = create_test_app(Config::default(), 0);
        let text = render(&app, 100, 30);
        assert!(text.contains("IDLE"));
        assert!(text.contains("Pool (0)"));
    }

    #[test]
    fn test_idle_generative_mode_hints_generation() {
        let app = create_test_app(
            Config {
                mode: PracticeMode::Shapes,
                ..Config::default()
            },
            0,
        );
        assert!(render(&app, 100, 30).contains("(g) to generate"));
    }

    #[test]
    fn test_idle_ramped_mode_previews_schedule() {
        let app = create_test_app(
            Config {
                mode: PracticeMode::Precision,
                total_session_secs: 60,
                ..Config::default()
            },
            10,
        );
        let text = render(&app, 100, 30);
        assert!(text.contains("10 of 10 images, 5s → 7s"));
    }

    #[test]
    fn test_idle_normal_mode_shows_durations() {
        let app = create_test_app(Config::default(), 3);
        assert!(render(&app, 100, 30).contains("3 images, 30s each, 5s rest"));
    }

    #[test]
    fn test_interval_phase_names_next_image() {
        let mut app = create_test_app(
            Config {
                per_image_secs: 2,
                shuffle: false,
                ..Config::default()
            },
            3,
        );
        let now = Local::now();
        app.practice.toggle(now).unwrap();
        app.practice.tick(now + Duration::seconds(1));
        app.practice.tick(now + Duration::seconds(2));
        let text = render(&app, 100, 30);
        assert!(text.contains("next up: pose-1.png"));
    }

    #[test]
    fn test_zen_mode_is_untimed() {
        let mut app = create_test_app(
            Config {
                mode: PracticeMode::Zen,
                ..Config::default()
            },
            2,
        );
        app.practice.toggle(Local::now()).unwrap();
        assert!(render(&app, 100, 30).contains("untimed"));
    }

    #[test]
    fn test_pool_overflow_is_counted() {
        let app = create_test_app(Config::default(), 9);
        assert!(render(&app, 100, 30).contains("Pool (9, 3 more)"));
    }

    #[test]
    fn test_pending_slots_render() {
        let mut app = create_test_app(
            Config {
                mode: PracticeMode::Poses,
                ..Config::default()
            },
            0,
        );
        app.practice.begin_generation(2, Local::now());
        let text = render(&app, 100, 30);
        assert!(text.contains("generating"));
        assert!(text.contains("0/2"));
    }

    #[test]
    fn test_status_line() {
        let mut app = create_test_app(Config::default(), 0);
        app.status = Some("no images loaded".to_string());
        assert!(render(&app, 100, 30).contains("no images loaded"));
    }

    #[test]
    fn test_summary_dialog() {
        let mut app = create_test_app(
            Config {
                mode: PracticeMode::Speed,
                total_session_secs: 10,
                ..Config::default()
            },
            2,
        );
        let now = Local::now();
        app.practice.toggle(now).unwrap();
        app.practice
            .apply(ClockEvent::Reset, now + Duration::seconds(4))
            .unwrap();

        let area = Rect::new(0, 0, 80, 24);
        let mut buffer = Buffer::empty(area);
        render_summary(&app, area, &mut buffer);
        let text: String = buffer.content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Session complete"));
        assert!(text.contains("4s practised, 1 images"));
    }

    #[test]
    fn test_ui_widget_extreme_sizes() {
        let app = create_test_app(Config::default(), 3);
        for (w, h) in [(1, 1), (5, 3), (300, 100)] {
            render(&app, w, h);
        }
    }
}
