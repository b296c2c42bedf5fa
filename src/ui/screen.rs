use ratatui::Frame;

use crate::{
    ui::{history::render_history, render_summary},
    App, AppState,
};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Practice screen - the countdown, the current image and the pool
pub struct PracticeScreen;

impl Screen for PracticeScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Summary screen - the practice screen with the finished-session dialog on top
pub struct SummaryScreen;

impl Screen for SummaryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        let area = f.area();
        render_summary(app, area, f.buffer_mut());
    }
}

/// History screen - uses dedicated renderer
pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_history(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Practice => Box::new(PracticeScreen),
        AppState::Summary => Box::new(SummaryScreen),
        AppState::History => Box::new(HistoryScreen),
    }
}
