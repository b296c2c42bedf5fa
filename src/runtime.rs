use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::generator::GenerationEvent;

/// Cadence of the session countdown.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    Generation(GenerationEvent),
}

impl From<GenerationEvent> for AppEvent {
    fn from(ev: GenerationEvent) -> Self {
        AppEvent::Generation(ev)
    }
}

/// Source of terminal and worker events
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;

    /// Handle background workers post their results through.
    fn sender(&self) -> Sender<AppEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        let reader = tx.clone();
        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(CtEvent::Key(key)) => AppEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    log::error!("terminal event reader stopped: {}", e);
                    break;
                }
            };
            if reader.send(ev).is_err() {
                break;
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<AppEvent> {
        self.tx.clone()
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source fed from a channel the test holds
pub struct TestEventSource {
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<AppEvent> {
        self.tx.clone()
    }
}

/// Runner that hands the app one event at a time, with a Tick whenever the
/// tick deadline passes.
///
/// Events arriving between ticks do not move the deadline. A deadline that
/// was missed by more than one interval is not caught up: one Tick is
/// delivered and the next deadline is measured from now.
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    deadline: Instant,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let deadline = Instant::now() + ticker.interval();
        Self {
            event_source,
            ticker,
            deadline,
        }
    }

    pub fn event_source(&self) -> &E {
        &self.event_source
    }

    /// Start a fresh tick interval from now, e.g. after start, resume or seek.
    pub fn restart(&mut self) {
        self.deadline = Instant::now() + self.ticker.interval();
    }

    /// Blocks until the next event, or returns Tick once the deadline passes
    pub fn step(&mut self) -> AppEvent {
        let now = Instant::now();
        if now >= self.deadline {
            return self.tick(now);
        }
        match self.event_source.recv_timeout(self.deadline - now) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => self.tick(Instant::now()),
            Err(RecvTimeoutError::Disconnected) => {
                let now = Instant::now();
                if self.deadline > now {
                    std::thread::sleep(self.deadline - now);
                }
                self.tick(Instant::now())
            }
        }
    }

    fn tick(&mut self, now: Instant) -> AppEvent {
        self.deadline += self.ticker.interval();
        if self.deadline <= now {
            self.deadline = now + self.ticker.interval();
        }
        AppEvent::Tick
    }
}
