use chrono::{DateTime, Local, SecondsFormat};
use log::info;
use serde::{Deserialize, Serialize};

use crate::session::{ImageSet, PracticeMode};

/// One finished practice session, as kept in the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub date: DateTime<Local>,
    pub mode: PracticeMode,
    pub total_duration_secs: u64,
    pub images_completed: usize,
    pub image_set: ImageSet,
}

/// Tracks when the current session started and turns its end into a record.
#[derive(Debug, Default, Clone)]
pub struct SessionRecorder {
    started_at: Option<DateTime<Local>>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now: DateTime<Local>) {
        self.started_at = Some(now);
    }

    /// Closes the session. Instant resets (no elapsed time and still on the
    /// first image) produce no record.
    pub fn finish(
        &mut self,
        now: DateTime<Local>,
        mode: PracticeMode,
        current_index: usize,
        images_completed: usize,
    ) -> Option<SessionRecord> {
        let started_at = self.started_at.take()?;
        let total_duration_secs = elapsed_secs(started_at, now);

        if total_duration_secs == 0 && current_index == 0 {
            return None;
        }

        info!(
            "{} session ended after {}s with {} images",
            mode, total_duration_secs, images_completed
        );
        Some(SessionRecord {
            id: now.to_rfc3339_opts(SecondsFormat::Millis, false),
            date: now,
            mode,
            total_duration_secs,
            images_completed,
            image_set: mode.image_set(),
        })
    }
}

/// Whole seconds between two instants, rounded to nearest.
fn elapsed_secs(start: DateTime<Local>, end: DateTime<Local>) -> u64 {
    let ms = (end - start).num_milliseconds().max(0);
    ((ms + 500) / 1000) as u64
}
