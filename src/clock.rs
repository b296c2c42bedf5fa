//! The session countdown as an explicit state machine.
//!
//! [`transition`] is a pure function of the current [`TimerState`], an
//! incoming [`ClockEvent`] and the session [`Schedule`]. It never sleeps and
//! never touches the outside world: side effects come back as [`Effect`]s for
//! the owner to carry out. [`SessionClock`] owns the state, the session's
//! image order and its schedule.

use log::{debug, info};
use rand::Rng;

use crate::error::SessionError;
use crate::planner::plan;
use crate::pool::{start_ordering, ImageRef};
use crate::session::{PracticeMode, SessionConfig};

/// Seconds remaining at which an audible alert fires during image display.
pub const ALERT_SECONDS: [u32; 3] = [3, 2, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Generating,
    Finished,
}

impl RunState {
    /// Running or paused: a session is in progress.
    pub fn is_active(self) -> bool {
        matches!(self, RunState::Running | RunState::Paused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayPhase {
    #[default]
    Image,
    Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerState {
    pub current_index: usize,
    pub current_duration: u32,
    pub time_remaining: u32,
    pub phase: DisplayPhase,
    pub run_state: RunState,
    /// steps along the session: forward by timer or `Next`, back by `Previous`
    pub advances: usize,
    /// highest `advances` reached, so stepping back does not count twice
    pub furthest: usize,
}

impl TimerState {
    pub fn idle(initial_duration: u32) -> Self {
        Self {
            current_duration: initial_duration,
            time_remaining: initial_duration,
            ..Self::default()
        }
    }

    /// Fraction of the current phase still to go, for progress bars.
    pub fn progress(&self, interval_secs: u32) -> f64 {
        let span = match self.phase {
            DisplayPhase::Image => self.current_duration,
            DisplayPhase::Interval => interval_secs,
        };
        if span == 0 {
            return 0.0;
        }
        f64::from(self.time_remaining) / f64::from(span)
    }
}

/// Everything about the session the state machine needs to look up.
#[derive(Debug, Clone, Copy)]
pub struct Schedule<'a> {
    pub mode: PracticeMode,
    pub fixed_duration: u32,
    pub durations: &'a [u32],
    pub interval_secs: u32,
    pub minimum_secs: u32,
    pub image_count: usize,
    pub audible_alerts: bool,
}

impl Schedule<'_> {
    pub fn duration_at(&self, index: usize) -> u32 {
        if self.mode.is_ramped() {
            self.durations
                .get(index)
                .copied()
                .unwrap_or(self.minimum_secs)
        } else {
            self.fixed_duration
        }
    }

    fn is_last(&self, index: usize) -> bool {
        index + 1 >= self.image_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Start,
    Pause,
    Resume,
    /// start, pause or resume depending on the current state
    Toggle,
    Tick,
    Next,
    Previous,
    Reset,
    /// the finished summary was dismissed
    Acknowledge,
    BeginGenerating,
    EndGenerating,
    /// an image at `position` in the order was dropped; the schedule already
    /// reflects the shorter order
    ImageRemoved { position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Alert { remaining: u32 },
    SessionStarted,
    /// a bounded session reached its end, or was ended early
    SessionFinished(SessionTally),
    /// a looping session was reset
    SessionEnded(SessionTally),
    /// the tick cadence must restart from now
    RestartTicker,
    ClearGeneratedPool,
}

/// How far a session got, captured at the moment it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTally {
    pub last_index: usize,
    pub images_completed: usize,
}

impl SessionTally {
    fn of(state: &TimerState, mode: PracticeMode) -> Self {
        let images_completed = if mode.is_bounded() {
            state.current_index + 1
        } else {
            state.furthest + 1
        };
        Self {
            last_index: state.current_index,
            images_completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: TimerState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &TimerState) -> Self {
        Self {
            state: *state,
            effects: Vec::new(),
        }
    }
}

pub fn transition(
    state: &TimerState,
    event: ClockEvent,
    schedule: &Schedule<'_>,
) -> Result<Transition, SessionError> {
    use ClockEvent::*;
    use RunState::*;

    let mut next = *state;
    let mut effects = Vec::new();

    match (state.run_state, event) {
        (Idle | Finished, Start | Toggle) => {
            if schedule.image_count == 0 {
                return Err(SessionError::NoImagesLoaded);
            }
            next = show_image(0, schedule);
            next.run_state = Running;
            effects.push(Effect::SessionStarted);
            effects.push(Effect::RestartTicker);
        }
        (Running, Pause | Toggle) => next.run_state = Paused,
        (Paused, Resume | Toggle) => {
            next.run_state = Running;
            effects.push(Effect::RestartTicker);
        }
        (Running, Tick) if schedule.mode.is_timed() => tick(&mut next, &mut effects, schedule),
        (Running | Paused, Next | Previous) => {
            let count = schedule.image_count.max(1);
            let (index, advances) = if event == Next {
                ((state.current_index + 1) % count, state.advances + 1)
            } else {
                (
                    (state.current_index + count - 1) % count,
                    state.advances.saturating_sub(1),
                )
            };
            next = show_image(index, schedule);
            next.run_state = state.run_state;
            next.advances = advances;
            next.furthest = state.furthest.max(advances);
            effects.push(Effect::RestartTicker);
        }
        (Running | Paused, Reset) => end_session(&mut next, &mut effects, schedule),
        (Idle | Finished, Reset) => next = TimerState::idle(schedule.duration_at(0)),
        (Finished, Acknowledge) => {
            next = TimerState::idle(schedule.duration_at(0));
            if schedule.mode.is_generative() {
                effects.push(Effect::ClearGeneratedPool);
            }
        }
        (Idle | Finished, BeginGenerating) => {
            next = TimerState::idle(schedule.duration_at(0));
            next.run_state = Generating;
        }
        (Generating, EndGenerating) => next.run_state = Idle,
        (Running | Paused, ImageRemoved { position }) => {
            if schedule.image_count == 0 {
                end_session(&mut next, &mut effects, schedule);
            } else if position < state.current_index {
                // same image stays on screen at a shifted index
                next.current_index = state.current_index - 1;
            } else if position == state.current_index {
                let index = state.current_index.min(schedule.image_count - 1);
                next = show_image(index, schedule);
                next.run_state = state.run_state;
                next.advances = state.advances;
                next.furthest = state.furthest;
                effects.push(Effect::RestartTicker);
            }
        }
        _ => return Ok(Transition::unchanged(state)),
    }

    Ok(Transition {
        state: next,
        effects,
    })
}

fn show_image(index: usize, schedule: &Schedule<'_>) -> TimerState {
    let duration = schedule.duration_at(index);
    TimerState {
        current_index: index,
        current_duration: duration,
        time_remaining: duration,
        phase: DisplayPhase::Image,
        ..TimerState::default()
    }
}

fn tick(state: &mut TimerState, effects: &mut Vec<Effect>, schedule: &Schedule<'_>) {
    let remaining = state.time_remaining.saturating_sub(1);

    if state.phase == DisplayPhase::Image
        && schedule.audible_alerts
        && ALERT_SECONDS.contains(&remaining)
    {
        effects.push(Effect::Alert { remaining });
    }

    if remaining > 0 {
        state.time_remaining = remaining;
        return;
    }

    match state.phase {
        DisplayPhase::Image => {
            if schedule.mode.is_bounded() && schedule.is_last(state.current_index) {
                finish(state, effects, schedule);
            } else if schedule.interval_secs > 0 {
                state.phase = DisplayPhase::Interval;
                state.time_remaining = schedule.interval_secs;
            } else {
                advance(state, effects, schedule);
            }
        }
        DisplayPhase::Interval => advance(state, effects, schedule),
    }
}

fn advance(state: &mut TimerState, effects: &mut Vec<Effect>, schedule: &Schedule<'_>) {
    let next_index = state.current_index + 1;
    if next_index >= schedule.image_count {
        if schedule.mode.is_bounded() {
            finish(state, effects, schedule);
            return;
        }
        step_forward(state, 0, schedule);
    } else {
        step_forward(state, next_index, schedule);
    }
    state.run_state = RunState::Running;
}

fn step_forward(state: &mut TimerState, index: usize, schedule: &Schedule<'_>) {
    let advances = state.advances + 1;
    let furthest = state.furthest.max(advances);
    *state = show_image(index, schedule);
    state.advances = advances;
    state.furthest = furthest;
}

fn finish(state: &mut TimerState, effects: &mut Vec<Effect>, schedule: &Schedule<'_>) {
    effects.push(Effect::SessionFinished(SessionTally::of(state, schedule.mode)));
    state.run_state = RunState::Finished;
    state.time_remaining = 0;
}

fn end_session(state: &mut TimerState, effects: &mut Vec<Effect>, schedule: &Schedule<'_>) {
    if schedule.mode.is_bounded() {
        finish(state, effects, schedule);
    } else {
        effects.push(Effect::SessionEnded(SessionTally::of(state, schedule.mode)));
        *state = TimerState::idle(schedule.duration_at(0));
    }
}

/// Owns the session's image order, its schedule and the timer state.
#[derive(Debug, Clone)]
pub struct SessionClock {
    config: SessionConfig,
    order: Vec<ImageRef>,
    durations: Vec<u32>,
    state: TimerState,
}

impl SessionClock {
    pub fn new(config: SessionConfig) -> Self {
        let initial = config.fixed_duration();
        Self {
            config,
            order: Vec::new(),
            durations: Vec::new(),
            state: TimerState::idle(initial),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Settings only change between sessions, never while images are generated.
    pub fn set_config(&mut self, config: SessionConfig) {
        let run_state = self.state.run_state;
        if run_state.is_active() || run_state == RunState::Generating {
            return;
        }
        self.state = TimerState::idle(config.fixed_duration());
        self.config = config;
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn order(&self) -> &[ImageRef] {
        &self.order
    }

    pub fn durations(&self) -> &[u32] {
        &self.durations
    }

    pub fn current_image(&self) -> Option<&ImageRef> {
        if self.state.run_state.is_active() {
            self.order.get(self.state.current_index)
        } else {
            None
        }
    }

    pub fn schedule(&self) -> Schedule<'_> {
        Schedule {
            mode: self.config.mode,
            fixed_duration: self.config.fixed_duration(),
            durations: &self.durations,
            interval_secs: self.config.interval_secs,
            minimum_secs: self.config.minimum_image_secs,
            image_count: self.order.len(),
            audible_alerts: self.config.audible_alerts,
        }
    }

    /// Derives the order and schedule from `images` and starts the countdown.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        images: &[ImageRef],
        rng: &mut R,
    ) -> Result<Vec<Effect>, SessionError> {
        if images.is_empty() {
            return Err(SessionError::NoImagesLoaded);
        }
        self.config.validate()?;

        let order = start_ordering(images, &self.config, rng);
        let durations = plan(
            self.config.mode,
            order.len(),
            self.config.total_session_secs,
            self.config.minimum_image_secs,
        );
        let previous = (
            std::mem::replace(&mut self.order, order),
            std::mem::replace(&mut self.durations, durations),
        );

        match self.apply(ClockEvent::Start) {
            Ok(effects) => {
                info!(
                    "{} session started with {} images",
                    self.config.mode,
                    self.order.len()
                );
                Ok(effects)
            }
            Err(e) => {
                (self.order, self.durations) = previous;
                Err(e)
            }
        }
    }

    pub fn apply(&mut self, event: ClockEvent) -> Result<Vec<Effect>, SessionError> {
        let Transition { state, effects } = transition(&self.state, event, &self.schedule())?;
        if state != self.state {
            debug!("clock {:?}: {:?} -> {:?}", event, self.state.run_state, state.run_state);
        }
        self.state = state;
        if self.state.run_state == RunState::Idle {
            self.order.clear();
            self.durations.clear();
        }
        Ok(effects)
    }

    /// Toggle between start, pause and resume; starting derives a fresh order.
    pub fn toggle<R: Rng + ?Sized>(
        &mut self,
        images: &[ImageRef],
        rng: &mut R,
    ) -> Result<Vec<Effect>, SessionError> {
        match self.state.run_state {
            RunState::Idle | RunState::Finished => self.start(images, rng),
            _ => self.apply(ClockEvent::Toggle),
        }
    }

    /// Drops `image` from the live order after it left the pool.
    pub fn remove_image(&mut self, image: &ImageRef) -> Vec<Effect> {
        if !self.state.run_state.is_active() {
            return Vec::new();
        }
        let Some(position) = self.order.iter().position(|i| i == image) else {
            return Vec::new();
        };
        self.order.remove(position);
        if self.config.mode.is_ramped() && position < self.durations.len() {
            self.durations.remove(position);
        }
        self.apply(ClockEvent::ImageRemoved { position })
            .unwrap_or_default()
    }

    /// How far the current session has got so far.
    pub fn tally(&self) -> SessionTally {
        SessionTally::of(&self.state, self.config.mode)
    }
}
