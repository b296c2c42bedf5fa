pub mod ui;

use chrono::{DateTime, Local};
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use lineflow::{
    alert::{AlertSink, TerminalBell},
    app_dirs::AppDirs,
    clock::{ClockEvent, RunState},
    config::{Config, ConfigStore, FileConfigStore},
    error::SessionError,
    generator::{GenerationEvent, GenerationQueue, ImageGenerator, PlaceholderGenerator, PromptKind},
    history::{export_csv, HistoryStore, HistorySummary, MemoryHistoryStore, SqliteHistoryStore},
    loader::load_images,
    practice::Practice,
    recorder::SessionRecord,
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    session::PracticeMode,
    util::format_duration,
};
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    path::{Path, PathBuf},
    sync::{mpsc::Sender, Arc},
};
use webbrowser::Browser;

/// gesture drawing practice in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed reference images for gesture drawing practice. Load image files or folders, pick a mode, and draw while the countdown runs. Ramped modes spread a fixed session budget over the images; every session is kept in a local history."
)]
pub struct Cli {
    /// image files or folders to load
    paths: Vec<PathBuf>,

    /// practice mode
    #[clap(short = 'm', long, value_enum)]
    mode: Option<PracticeMode>,

    /// seconds per image (normal and generated modes)
    #[clap(short = 'd', long)]
    duration: Option<u32>,

    /// total session budget in seconds (precision and speed modes)
    #[clap(short = 't', long)]
    total: Option<u32>,

    /// rest seconds between images, 0 for none
    #[clap(short = 'i', long)]
    interval: Option<u32>,

    /// shortest time any image gets in ramped modes
    #[clap(long)]
    minimum: Option<u32>,

    /// shuffle the images when a session starts
    #[clap(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    shuffle: Option<bool>,

    /// ring the terminal bell during the last three seconds of each image
    #[clap(short = 'a', long)]
    alerts: bool,

    /// number of images to generate in shapes and poses modes
    #[clap(short = 'n', long)]
    count: Option<usize>,

    /// description used to generate images
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// print the session history and exit
    #[clap(long)]
    history: bool,

    /// write the session history to a CSV file and exit
    #[clap(long, value_name = "FILE")]
    export_history: Option<PathBuf>,

    /// delete the session history and exit
    #[clap(long)]
    clear_history: bool,
}

impl Cli {
    /// Overlay the flags given on the command line onto the saved settings.
    fn apply_to(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(d) = self.duration {
            config.per_image_secs = d;
        }
        if let Some(t) = self.total {
            config.total_session_secs = t;
        }
        if let Some(i) = self.interval {
            config.interval_secs = i;
        }
        if let Some(m) = self.minimum {
            config.minimum_image_secs = m;
        }
        if let Some(s) = self.shuffle {
            config.shuffle = s;
        }
        if self.alerts {
            config.audible_alerts = true;
        }
        if let Some(n) = self.count {
            config.generated_count = n;
        }
        if let Some(p) = &self.prompt {
            config.prompt = p.clone();
        }
    }

    fn is_history_command(&self) -> bool {
        self.history || self.export_history.is_some() || self.clear_history
    }
}

pub type AppPractice = Practice<Box<dyn HistoryStore>, Box<dyn AlertSink>, StdRng>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Practice,
    Summary,
    History,
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub records: Vec<SessionRecord>,
    pub scroll_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub config: Config,
    pub practice: AppPractice,
    pub state: AppState,
    pub history_state: HistoryState,
    /// one-line message shown until the next key press
    pub status: Option<String>,
    generator: Arc<dyn ImageGenerator>,
}

impl App {
    pub fn new(
        config: Config,
        history: Box<dyn HistoryStore>,
        alerts: Box<dyn AlertSink>,
        rng: StdRng,
    ) -> Self {
        Self {
            practice: Practice::new(config.session_config(), history, alerts, rng),
            config,
            state: AppState::Practice,
            history_state: HistoryState::default(),
            status: None,
            generator: Arc::new(PlaceholderGenerator),
        }
    }

    pub fn load_paths<P: AsRef<Path>>(&mut self, paths: &[P]) {
        if paths.is_empty() {
            return;
        }
        let added = self.practice.add_images(load_images(paths));
        self.status = Some(if added == 0 {
            "no images found in the given paths".to_string()
        } else {
            format!("loaded {} image(s)", added)
        });
    }

    pub fn on_event(&mut self, ev: AppEvent, now: DateTime<Local>, tx: &Sender<AppEvent>) -> Flow {
        let flow = match ev {
            AppEvent::Tick => {
                self.practice.tick(now);
                Flow::Continue
            }
            AppEvent::Resize => Flow::Continue,
            AppEvent::Generation(ev) => {
                self.on_generation(ev, now);
                Flow::Continue
            }
            AppEvent::Key(key) => self.on_key(key, now, tx),
        };
        self.sync_state();
        flow
    }

    fn on_key(&mut self, key: KeyEvent, now: DateTime<Local>, tx: &Sender<AppEvent>) -> Flow {
        // ctrl+c to quit
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }
        if key.code == KeyCode::Char('q') {
            return Flow::Quit;
        }
        self.status = None;

        match self.state {
            AppState::Practice => match key.code {
                KeyCode::Esc => return Flow::Quit,
                KeyCode::Char(' ') => {
                    let result = self.practice.toggle(now);
                    self.report(result);
                }
                KeyCode::Right => {
                    let result = self.practice.apply(ClockEvent::Next, now);
                    self.report(result);
                }
                KeyCode::Left => {
                    let result = self.practice.apply(ClockEvent::Previous, now);
                    self.report(result);
                }
                KeyCode::Char('r') => {
                    let result = self.practice.apply(ClockEvent::Reset, now);
                    self.report(result);
                }
                KeyCode::Char('o') => self.open_current_image(),
                KeyCode::Char('d') => {
                    if self.practice.remove_current_image(now).is_none() {
                        self.status = Some("no image on screen".to_string());
                    }
                }
                KeyCode::Char('c') => {
                    self.practice.clear_images(now);
                }
                KeyCode::Char('g') => self.generate(now, tx),
                KeyCode::Char('m') => self.cycle_mode(),
                KeyCode::Char('h') => self.open_history(),
                _ => {}
            },
            AppState::Summary => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.practice.acknowledge(now);
                    self.state = AppState::Practice;
                }
            }
            AppState::History => match key.code {
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Char('b') => {
                    self.state = AppState::Practice;
                }
                KeyCode::Up => {
                    self.history_state.scroll_offset =
                        self.history_state.scroll_offset.saturating_sub(1);
                }
                KeyCode::Down => {
                    // Will check max scroll in render function
                    self.history_state.scroll_offset += 1;
                }
                KeyCode::Home => self.history_state.scroll_offset = 0,
                KeyCode::Char('x') => match self.practice.clear_history() {
                    Ok(()) => {
                        self.history_state = HistoryState::default();
                        self.status = Some("history cleared".to_string());
                    }
                    Err(e) => self.status = Some(e.to_string()),
                },
                _ => {}
            },
        }
        Flow::Continue
    }

    fn report<T>(&mut self, result: Result<T, SessionError>) {
        if let Err(e) = result {
            self.status = Some(e.to_string());
        }
    }

    /// Show the summary once a session finished with a record.
    fn sync_state(&mut self) {
        if self.state == AppState::Practice
            && self.practice.run_state() == RunState::Finished
            && self.practice.last_record().is_some()
        {
            self.state = AppState::Summary;
        }
    }

    fn open_history(&mut self) {
        self.history_state = HistoryState {
            records: self.practice.history(),
            scroll_offset: 0,
        };
        self.state = AppState::History;
    }

    fn cycle_mode(&mut self) {
        match self.practice.run_state() {
            RunState::Running | RunState::Paused => {
                self.status = Some("reset the session before changing mode".to_string());
                return;
            }
            RunState::Generating => {
                self.status = Some("wait for generation to finish".to_string());
                return;
            }
            RunState::Idle | RunState::Finished => {}
        }
        let modes = PracticeMode::value_variants();
        let pos = modes
            .iter()
            .position(|m| *m == self.config.mode)
            .unwrap_or(0);
        self.config.mode = modes[(pos + 1) % modes.len()];
        self.practice.set_config(self.config.session_config());
    }

    fn generate(&mut self, now: DateTime<Local>, tx: &Sender<AppEvent>) {
        let kind = match self.config.mode {
            PracticeMode::Shapes => PromptKind::Shape,
            PracticeMode::Poses => PromptKind::Pose,
            _ => {
                self.status = Some("switch to shapes or poses mode to generate images".to_string());
                return;
            }
        };
        if self.practice.run_state() != RunState::Idle {
            self.status = Some("generation is only possible between sessions".to_string());
            return;
        }
        let prompt = match kind.build(&self.config.prompt) {
            Ok(prompt) => prompt,
            Err(e) => {
                self.status = Some(e.to_string());
                return;
            }
        };

        let slots = self
            .practice
            .begin_generation(self.config.generated_count, now);
        info!("generating {} image(s)", slots.len());
        GenerationQueue::spawn(self.generator.clone(), prompt, slots, tx.clone());
    }

    fn on_generation(&mut self, ev: GenerationEvent, now: DateTime<Local>) {
        let done = ev == GenerationEvent::Done;
        let progress = self.practice.generation();
        if let Some(e) = self.practice.on_generation_event(ev, now) {
            self.status = Some(e.to_string());
        }
        if let (true, Some(progress)) = (done, progress) {
            self.status = Some(format!(
                "{} of {} images generated",
                progress.succeeded, progress.requested
            ));
        }
    }

    fn open_current_image(&mut self) {
        let Some(image) = self.practice.current_image() else {
            self.status = Some("no image on screen".to_string());
            return;
        };
        if !Browser::is_available() {
            self.status = Some("no image viewer available".to_string());
            return;
        }
        let target = image.viewer_target();
        if let Err(e) = webbrowser::open(&target) {
            warn!("could not open {}: {}", target, e);
            self.status = Some(format!("could not open {}", image.display_name()));
        }
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .target(env_logger::Target::Pipe(Box::new(file)))
            .try_init();
    }
}

/// Runs `--history`, `--export-history` and `--clear-history`.
fn run_history_command(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut store = SqliteHistoryStore::new()?;
    let mut stdout = io::stdout();

    if cli.clear_history {
        store.clear()?;
        writeln!(stdout, "session history cleared")?;
    }
    let records = store.load()?;
    if let Some(path) = &cli.export_history {
        export_csv(&records, path)?;
        writeln!(
            stdout,
            "exported {} session(s) to {}",
            records.len(),
            path.display()
        )?;
    }
    if cli.history {
        print_history(&records, &mut stdout)?;
    }
    Ok(())
}

fn print_history<W: Write>(records: &[SessionRecord], out: &mut W) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "no sessions recorded yet");
    }
    for r in records {
        writeln!(
            out,
            "{}  {:<10}  {:>8}  {:>3} images  {}",
            r.date.format("%Y-%m-%d %H:%M"),
            r.mode.title(),
            format_duration(r.total_duration_secs),
            r.images_completed,
            r.image_set
        )?;
    }
    let summary = HistorySummary::from_records(records);
    writeln!(
        out,
        "{} session(s), {} practised, {} images",
        summary.sessions,
        format_duration(summary.total_secs),
        summary.total_images
    )
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if cli.is_history_command() {
        return run_history_command(&cli);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply_to(&mut config);

    let history: Box<dyn HistoryStore> = match SqliteHistoryStore::new() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("history unavailable, keeping this run in memory: {}", e);
            Box::new(MemoryHistoryStore::new())
        }
    };
    let mut app = App::new(config, history, Box::new(TerminalBell), StdRng::from_entropy());
    app.load_paths(&cli.paths);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let result = start_tui(&mut terminal, &mut app, &mut runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Err(e) = config_store.save(&app.config) {
        warn!("could not save settings: {}", e);
    }

    result
}

fn start_tui<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &mut Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    let tx = runner.event_source().sender();

    loop {
        terminal.draw(|f| ui(app, f))?;

        let ev = runner.step();
        let flow = app.on_event(ev, Local::now(), &tx);
        if app.practice.take_ticker_restart() {
            runner.restart();
        }
        if flow == Flow::Quit {
            break;
        }
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    let screen = ui::screen::current_screen(&app.state);
    screen.render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lineflow::alert::RecordedAlerts;
    use lineflow::error::GenerationError;
    use lineflow::pool::ImageRef;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::mpsc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn test_app(config: Config) -> App {
        App::new(
            config,
            Box::new(MemoryHistoryStore::new()),
            Box::new(RecordedAlerts::default()),
            StdRng::seed_from_u64(3),
        )
    }

    fn images(n: usize) -> Vec<ImageRef> {
        (0..n).map(|i| ImageRef::new(format!("/refs/{i}.png"))).collect()
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["lineflow"]);

        assert!(cli.paths.is_empty());
        assert_eq!(cli.mode, None);
        assert_eq!(cli.shuffle, None);
        assert!(!cli.alerts);
        assert!(!cli.is_history_command());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from([
            "lineflow",
            "refs/",
            "--mode",
            "speed",
            "--total",
            "120",
            "--interval",
            "0",
            "--minimum",
            "4",
            "--shuffle",
            "false",
            "--alerts",
            "--count",
            "4",
            "--prompt",
            "a teapot",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(cli.paths, vec![PathBuf::from("refs/")]);
        assert_eq!(config.mode, PracticeMode::Speed);
        assert_eq!(config.total_session_secs, 120);
        assert_eq!(config.interval_secs, 0);
        assert_eq!(config.minimum_image_secs, 4);
        assert!(!config.shuffle);
        assert!(config.audible_alerts);
        assert_eq!(config.generated_count, 4);
        assert_eq!(config.prompt, "a teapot");
        // untouched
        assert_eq!(config.per_image_secs, Config::default().per_image_secs);
    }

    #[test]
    fn test_cli_history_flags() {
        assert!(Cli::parse_from(["lineflow", "--history"]).is_history_command());
        assert!(Cli::parse_from(["lineflow", "--clear-history"]).is_history_command());
        let cli = Cli::parse_from(["lineflow", "--export-history", "out.csv"]);
        assert_eq!(cli.export_history, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_space_without_images_sets_status() {
        let mut app = test_app(Config::default());
        let (tx, _rx) = mpsc::channel();

        app.on_event(key(KeyCode::Char(' ')), Local::now(), &tx);
        assert_eq!(app.practice.run_state(), RunState::Idle);
        assert!(app.status.as_deref().unwrap_or_default().contains("no images"));
    }

    #[test]
    fn test_bounded_session_shows_summary_then_returns() {
        let mut app = test_app(Config {
            mode: PracticeMode::Precision,
            total_session_secs: 20,
            interval_secs: 0,
            ..Config::default()
        });
        app.practice.add_images(images(4));
        let (tx, _rx) = mpsc::channel();
        let mut now = Local::now();

        app.on_event(key(KeyCode::Char(' ')), now, &tx);
        assert_eq!(app.practice.run_state(), RunState::Running);
        for _ in 0..20 {
            now += Duration::seconds(1);
            app.on_event(AppEvent::Tick, now, &tx);
        }
        assert_eq!(app.state, AppState::Summary);

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| ui(&mut app, f)).unwrap();
        assert!(buffer_text(&terminal).contains("Session complete"));

        app.on_event(key(KeyCode::Enter), now, &tx);
        assert_eq!(app.state, AppState::Practice);
        assert_eq!(app.practice.run_state(), RunState::Idle);
        assert_eq!(app.practice.history().len(), 1);
    }

    #[test]
    fn test_history_screen_and_clear() {
        let mut app = test_app(Config {
            interval_secs: 0,
            ..Config::default()
        });
        app.practice.add_images(images(2));
        let (tx, _rx) = mpsc::channel();
        let mut now = Local::now();

        app.on_event(key(KeyCode::Char(' ')), now, &tx);
        now += Duration::seconds(3);
        app.on_event(key(KeyCode::Char('r')), now, &tx);
        app.on_event(key(KeyCode::Char('h')), now, &tx);
        assert_eq!(app.state, AppState::History);
        assert_eq!(app.history_state.records.len(), 1);

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(&mut app, f)).unwrap();
        assert!(buffer_text(&terminal).contains("Normal"));

        app.on_event(key(KeyCode::Char('x')), now, &tx);
        assert!(app.history_state.records.is_empty());
        assert!(app.practice.history().is_empty());

        app.on_event(key(KeyCode::Esc), now, &tx);
        assert_eq!(app.state, AppState::Practice);
    }

    #[test]
    fn test_seek_keys_and_ticker_restart() {
        let mut app = test_app(Config {
            shuffle: false,
            ..Config::default()
        });
        app.practice.add_images(images(3));
        let (tx, _rx) = mpsc::channel();
        let now = Local::now();

        app.on_event(key(KeyCode::Char(' ')), now, &tx);
        assert!(app.practice.take_ticker_restart());
        app.on_event(key(KeyCode::Right), now, &tx);
        assert!(app.practice.take_ticker_restart());
        assert_eq!(app.practice.current_image(), Some(&ImageRef::new("/refs/1.png")));
        app.on_event(key(KeyCode::Left), now, &tx);
        app.on_event(key(KeyCode::Left), now, &tx);
        assert_eq!(app.practice.current_image(), Some(&ImageRef::new("/refs/2.png")));
    }

    #[test]
    fn test_remove_and_clear_keys() {
        let mut app = test_app(Config {
            shuffle: false,
            ..Config::default()
        });
        app.practice.add_images(images(3));
        let (tx, _rx) = mpsc::channel();
        let now = Local::now();

        app.on_event(key(KeyCode::Char(' ')), now, &tx);
        app.on_event(key(KeyCode::Char('d')), now, &tx);
        assert_eq!(app.practice.pool().len(), 2);
        assert_eq!(app.practice.current_image(), Some(&ImageRef::new("/refs/1.png")));

        app.on_event(key(KeyCode::Char('c')), now, &tx);
        assert!(app.practice.pool().is_empty());
        assert_eq!(app.practice.run_state(), RunState::Idle);
    }

    #[test]
    fn test_mode_cycles_only_between_sessions() {
        let mut app = test_app(Config::default());
        let (tx, _rx) = mpsc::channel();
        let now = Local::now();

        app.on_event(key(KeyCode::Char('m')), now, &tx);
        assert_eq!(app.config.mode, PracticeMode::Precision);
        assert_eq!(app.practice.config().mode, PracticeMode::Precision);

        app.practice.add_images(images(2));
        app.on_event(key(KeyCode::Char(' ')), now, &tx);
        app.on_event(key(KeyCode::Char('m')), now, &tx);
        assert_eq!(app.config.mode, PracticeMode::Precision);
        assert!(app.status.is_some());
    }

    #[test]
    fn test_mode_is_kept_while_generating() {
        let mut app = test_app(Config {
            mode: PracticeMode::Shapes,
            generated_count: 2,
            ..Config::default()
        });
        let (tx, rx) = mpsc::channel();
        let now = Local::now();

        app.on_event(key(KeyCode::Char('g')), now, &tx);
        assert_eq!(app.practice.run_state(), RunState::Generating);
        app.on_event(key(KeyCode::Char('m')), now, &tx);
        assert_eq!(app.config.mode, PracticeMode::Shapes);
        assert_eq!(app.practice.run_state(), RunState::Generating);
        assert_eq!(app.status.as_deref(), Some("wait for generation to finish"));

        // a second request does not start another worker
        app.on_event(key(KeyCode::Char('g')), now, &tx);
        assert_eq!(app.practice.pool().len(), 2);

        while app.practice.run_state() == RunState::Generating {
            let ev = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
            app.on_event(ev, now, &tx);
        }
        assert_eq!(app.practice.pool().ready_count(), 2);
    }

    #[test]
    fn test_instant_reset_of_bounded_session_allows_generating() {
        let mut app = test_app(Config {
            mode: PracticeMode::Shapes,
            generated_count: 2,
            ..Config::default()
        });
        app.practice.add_images(images(2));
        let (tx, _rx) = mpsc::channel();
        let now = Local::now();

        app.on_event(key(KeyCode::Char(' ')), now, &tx);
        app.on_event(key(KeyCode::Char('r')), now, &tx);
        assert_eq!(app.state, AppState::Practice);
        assert_eq!(app.practice.run_state(), RunState::Idle);

        app.on_event(key(KeyCode::Char('g')), now, &tx);
        assert_eq!(app.practice.run_state(), RunState::Generating);
    }

    #[test]
    fn test_generate_outside_generative_mode_is_refused() {
        let mut app = test_app(Config::default());
        let (tx, rx) = mpsc::channel();

        app.on_event(key(KeyCode::Char('g')), Local::now(), &tx);
        assert!(app.status.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_generate_short_prompt_is_refused() {
        let mut app = test_app(Config {
            mode: PracticeMode::Poses,
            prompt: "a dog".to_string(),
            ..Config::default()
        });
        let (tx, _rx) = mpsc::channel();

        app.on_event(key(KeyCode::Char('g')), Local::now(), &tx);
        assert_eq!(
            app.status,
            Some(GenerationError::PromptTooShort { minimum: 10 }.to_string())
        );
        assert_eq!(app.practice.run_state(), RunState::Idle);
    }

    #[test]
    fn test_generate_fills_pool_through_events() {
        let mut app = test_app(Config {
            mode: PracticeMode::Shapes,
            generated_count: 3,
            ..Config::default()
        });
        let (tx, rx) = mpsc::channel();
        let now = Local::now();

        app.on_event(key(KeyCode::Char('g')), now, &tx);
        assert_eq!(app.practice.run_state(), RunState::Generating);
        assert_eq!(app.practice.pool().pending_count(), 3);

        // the worker posts three slots then Done
        for _ in 0..4 {
            let ev = rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .unwrap();
            app.on_event(ev, now, &tx);
        }
        assert_eq!(app.practice.run_state(), RunState::Idle);
        assert_eq!(app.practice.pool().ready_count(), 3);
        assert_eq!(app.status.as_deref(), Some("3 of 3 images generated"));
    }

    #[test]
    fn test_q_quits_from_any_screen() {
        let mut app = test_app(Config::default());
        let (tx, _rx) = mpsc::channel();
        let now = Local::now();

        assert_eq!(app.on_event(key(KeyCode::Char('q')), now, &tx), Flow::Quit);
        app.state = AppState::History;
        assert_eq!(app.on_event(key(KeyCode::Char('q')), now, &tx), Flow::Quit);
        let ctrl_c = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(app.on_event(ctrl_c, now, &tx), Flow::Quit);
    }

    #[test]
    fn test_print_history() {
        let now = Local::now();
        let records = vec![SessionRecord {
            id: now.to_rfc3339(),
            date: now,
            mode: PracticeMode::Speed,
            total_duration_secs: 90,
            images_completed: 12,
            image_set: lineflow::session::ImageSet::Custom,
        }];
        let mut out = Vec::new();
        print_history(&records, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Speed"));
        assert!(text.contains("1m 30s"));
        assert!(text.contains("12 images"));
        assert!(text.contains("1 session(s)"));

        let mut out = Vec::new();
        print_history(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "no sessions recorded yet\n");
    }

    #[test]
    fn test_ui_renders_idle_running_and_paused() {
        let mut app = test_app(Config {
            shuffle: false,
            ..Config::default()
        });
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| ui(&mut app, f)).unwrap();
        assert!(buffer_text(&terminal).contains("IDLE"));

        app.practice.add_images(images(2));
        let (tx, _rx) = mpsc::channel();
        let now = Local::now();
        app.on_event(key(KeyCode::Char(' ')), now, &tx);
        terminal.draw(|f| ui(&mut app, f)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("0.png"));
        assert!(text.contains("30s"));

        app.on_event(key(KeyCode::Char(' ')), now, &tx);
        terminal.draw(|f| ui(&mut app, f)).unwrap();
        assert!(buffer_text(&terminal).contains("PAUSED"));
    }

    #[test]
    fn test_ui_small_area_does_not_panic() {
        let mut app = test_app(Config::default());
        app.practice.add_images(images(20));
        for (w, h) in [(10, 5), (20, 3), (200, 60)] {
            let mut terminal = Terminal::new(TestBackend::new(w, h)).unwrap();
            terminal.draw(|f| ui(&mut app, f)).unwrap();
        }
    }
}
