use chrono::{DateTime, Local};
use log::{info, warn};
use rand::Rng;

use crate::alert::AlertSink;
use crate::clock::{ClockEvent, Effect, RunState, SessionClock, SessionTally, TimerState};
use crate::error::{GenerationError, SessionError};
use crate::generator::{GenerationEvent, GenerationUpdate};
use crate::history::HistoryStore;
use crate::planner::SchedulePreview;
use crate::pool::{ImagePool, ImageRef, SlotId};
use crate::recorder::{SessionRecord, SessionRecorder};
use crate::session::SessionConfig;

/// Progress of the current generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationProgress {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl GenerationProgress {
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn percent(&self) -> u16 {
        if self.requested == 0 {
            return 0;
        }
        ((self.finished() * 100) / self.requested).min(100) as u16
    }
}

/// Owns the image pool, the session clock, the recorder and the history log,
/// and carries out the clock's side effects.
pub struct Practice<H: HistoryStore, A: AlertSink, R: Rng> {
    pool: ImagePool,
    clock: SessionClock,
    recorder: SessionRecorder,
    history: H,
    alerts: A,
    rng: R,
    last_record: Option<SessionRecord>,
    generation: Option<GenerationProgress>,
    restart_ticker: bool,
}

impl<H: HistoryStore, A: AlertSink, R: Rng> Practice<H, A, R> {
    pub fn new(config: SessionConfig, history: H, alerts: A, rng: R) -> Self {
        Self {
            pool: ImagePool::new(),
            clock: SessionClock::new(config),
            recorder: SessionRecorder::new(),
            history,
            alerts,
            rng,
            last_record: None,
            generation: None,
            restart_ticker: false,
        }
    }

    pub fn pool(&self) -> &ImagePool {
        &self.pool
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn state(&self) -> &TimerState {
        self.clock.state()
    }

    pub fn config(&self) -> &SessionConfig {
        self.clock.config()
    }

    pub fn alerts(&self) -> &A {
        &self.alerts
    }

    pub fn set_config(&mut self, config: SessionConfig) {
        self.clock.set_config(config);
    }

    pub fn current_image(&self) -> Option<&ImageRef> {
        self.clock.current_image()
    }

    /// Summary of the session that just finished, until acknowledged.
    pub fn last_record(&self) -> Option<&SessionRecord> {
        self.last_record.as_ref()
    }

    pub fn generation(&self) -> Option<GenerationProgress> {
        self.generation
    }

    pub fn preview(&self) -> SchedulePreview {
        let cfg = self.clock.config();
        SchedulePreview::new(
            cfg.mode,
            self.pool.ready_count(),
            cfg.total_session_secs,
            cfg.minimum_image_secs,
        )
    }

    pub fn add_images<I: IntoIterator<Item = ImageRef>>(&mut self, images: I) -> usize {
        let added = self.pool.extend(images);
        info!("{} image(s) added to the pool", added);
        added
    }

    /// Removes the pool slot at `index`, dropping it from a live session too.
    pub fn remove_image(&mut self, index: usize, now: DateTime<Local>) -> Option<ImageRef> {
        let image = self.pool.remove(index)?;
        let effects = self.clock.remove_image(&image);
        self.handle_effects(&effects, now);
        Some(image)
    }

    /// Removes the image on screen from the pool.
    pub fn remove_current_image(&mut self, now: DateTime<Local>) -> Option<ImageRef> {
        let image = self.clock.current_image()?.clone();
        let index = self
            .pool
            .slots()
            .iter()
            .position(|s| s.image() == Some(&image))?;
        self.remove_image(index, now)
    }

    pub fn clear_images(&mut self, now: DateTime<Local>) -> Vec<Effect> {
        self.pool.clear();
        if self.clock.state().run_state.is_active() {
            return self.apply(ClockEvent::Reset, now).unwrap_or_default();
        }
        Vec::new()
    }

    /// Start, pause or resume, like a play button.
    pub fn toggle(&mut self, now: DateTime<Local>) -> Result<Vec<Effect>, SessionError> {
        let images = self.pool.ready_images();
        let effects = self.clock.toggle(&images, &mut self.rng)?;
        self.handle_effects(&effects, now);
        Ok(effects)
    }

    pub fn apply(
        &mut self,
        event: ClockEvent,
        now: DateTime<Local>,
    ) -> Result<Vec<Effect>, SessionError> {
        let effects = self.clock.apply(event)?;
        self.handle_effects(&effects, now);
        Ok(effects)
    }

    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<Effect> {
        self.apply(ClockEvent::Tick, now).unwrap_or_default()
    }

    pub fn acknowledge(&mut self, now: DateTime<Local>) -> Vec<Effect> {
        self.last_record = None;
        self.apply(ClockEvent::Acknowledge, now).unwrap_or_default()
    }

    /// Clears the pool and reserves `count` placeholder slots to be filled by
    /// the generator.
    pub fn begin_generation(&mut self, count: usize, now: DateTime<Local>) -> Vec<SlotId> {
        let state = self.run_state();
        if state.is_active() || state == RunState::Generating {
            return Vec::new();
        }
        self.last_record = None;
        let _ = self.apply(ClockEvent::BeginGenerating, now);
        self.pool.clear();
        self.generation = Some(GenerationProgress {
            requested: count,
            ..GenerationProgress::default()
        });
        (0..count).map(|_| self.pool.reserve()).collect()
    }

    /// Applies one generation result. A failure only drops its own slot and is
    /// handed back for display.
    pub fn on_generation_event(
        &mut self,
        event: GenerationEvent,
        now: DateTime<Local>,
    ) -> Option<GenerationError> {
        match event {
            GenerationEvent::Slot(GenerationUpdate { slot, result }) => {
                let progress = self.generation.get_or_insert_with(GenerationProgress::default);
                match result {
                    Ok(image) => {
                        if self.pool.fulfill(slot, image) {
                            progress.succeeded += 1;
                        }
                        None
                    }
                    Err(e) => {
                        self.pool.fail(slot);
                        progress.failed += 1;
                        Some(e)
                    }
                }
            }
            GenerationEvent::Done => {
                let _ = self.apply(ClockEvent::EndGenerating, now);
                if let Some(progress) = self.generation.take() {
                    info!(
                        "generation done: {} of {} images",
                        progress.succeeded, progress.requested
                    );
                }
                None
            }
        }
    }

    pub fn history(&self) -> Vec<SessionRecord> {
        match self.history.load() {
            Ok(records) => records,
            Err(e) => {
                warn!("could not load session history: {}", e);
                Vec::new()
            }
        }
    }

    pub fn clear_history(&mut self) -> crate::error::HistoryResult<()> {
        self.history.clear()
    }

    fn handle_effects(&mut self, effects: &[Effect], now: DateTime<Local>) {
        for effect in effects {
            match *effect {
                Effect::Alert { remaining } => self.alerts.chime(remaining),
                Effect::SessionStarted => {
                    self.last_record = None;
                    self.recorder.start(now);
                }
                Effect::SessionFinished(tally) => {
                    self.last_record = self.record(tally, now);
                    if self.last_record.is_none() {
                        // nothing to summarise, go straight back to idle
                        let _ = self.clock.apply(ClockEvent::Reset);
                    }
                }
                Effect::SessionEnded(tally) => {
                    self.record(tally, now);
                }
                Effect::ClearGeneratedPool => self.pool.clear(),
                Effect::RestartTicker => self.restart_ticker = true,
            }
        }
    }

    fn record(&mut self, tally: SessionTally, now: DateTime<Local>) -> Option<SessionRecord> {
        let mode = self.clock.config().mode;
        let record = self
            .recorder
            .finish(now, mode, tally.last_index, tally.images_completed)?;
        if let Err(e) = self.history.prepend(record.clone()) {
            warn!("could not save session record: {}", e);
        }
        Some(record)
    }

    pub fn run_state(&self) -> RunState {
        self.clock.state().run_state
    }

    /// Whether the tick cadence must restart; clears the request.
    pub fn take_ticker_restart(&mut self) -> bool {
        std::mem::take(&mut self.restart_ticker)
    }
}
