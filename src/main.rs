mod ui;

use std::{
    error::Error,
    io::{self, stdin},
    time::{Duration, Instant},
};

use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{debug, warn};

use quizzle::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, SourceKind},
    logging::{init_logging, LogConfig},
    question::Difficulty,
    runtime::{ChannelEventSource, FetchWorker, FixedTicker, QuizEvent, QuizEventSource, Runner, ThreadClock, Ticker},
    session::{Advance, AnswerOutcome, Delivery, TickOutcome},
    source::{BankSource, QuestionSource, SourceError, TriviaApiSource},
    summary::ResultSummary,
    validate::RawConfig,
    QuizError, QuizMachine,
};

const POLL_INTERVAL_MS: u64 = 100;

/// timed trivia quiz in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A timed, scored trivia quiz: pick a category and difficulty, beat the countdown, and see how you did."
)]
pub struct Cli {
    /// player name
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// category to preselect
    #[clap(short = 'c', long)]
    category: Option<String>,

    /// question difficulty
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// number of questions (1-50)
    #[clap(short = 'q', long)]
    questions: Option<u32>,

    /// seconds allowed per question
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// where questions come from
    #[clap(long, value_enum)]
    source: Option<SourceKind>,

    /// base URL of the trivia API
    #[clap(long)]
    api_url: Option<String>,

    /// print the available categories and exit
    #[clap(long)]
    list_categories: bool,

    /// remember the given options as defaults
    #[clap(long)]
    save_config: bool,

    /// more detailed logs (repeatable)
    #[clap(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Command line values win over stored preferences.
    fn apply(&self, cfg: &mut Config) {
        if let Some(name) = &self.name {
            cfg.player_name = name.clone();
        }
        if let Some(difficulty) = self.difficulty {
            cfg.difficulty = difficulty;
        }
        if let Some(questions) = self.questions {
            cfg.question_count = questions;
        }
        if let Some(seconds) = self.seconds {
            cfg.seconds_per_question = seconds;
        }
        if let Some(source) = self.source {
            cfg.source = source;
        }
        if let Some(url) = &self.api_url {
            cfg.trivia_api_url = url.clone();
        }
    }
}

fn make_source(cfg: &Config) -> Result<Box<dyn QuestionSource + Send>, SourceError> {
    let source: Box<dyn QuestionSource + Send> = match cfg.source {
        SourceKind::Bank => Box::new(BankSource::bundled()?),
        SourceKind::TriviaApi => Box::new(TriviaApiSource::new(cfg.trivia_api_url.clone())?),
    };
    Ok(source)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Category,
    Difficulty,
    Count,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Name => Field::Category,
            Field::Category => Field::Difficulty,
            Field::Difficulty => Field::Count,
            Field::Count => Field::Name,
        }
    }

    fn prev(self) -> Self {
        match self {
            Field::Name => Field::Count,
            Field::Category => Field::Name,
            Field::Difficulty => Field::Category,
            Field::Count => Field::Difficulty,
        }
    }
}

/// Draft inputs on the setup screen.
#[derive(Debug, Clone)]
pub struct SetupForm {
    pub name: String,
    pub category: Option<usize>,
    pub difficulty: Difficulty,
    pub count: String,
    pub focus: Field,
    preferred_category: Option<String>,
}

impl SetupForm {
    fn new(cfg: &Config, preferred_category: Option<String>) -> Self {
        Self {
            name: cfg.player_name.clone(),
            category: None,
            difficulty: cfg.difficulty,
            count: cfg.question_count.to_string(),
            focus: Field::Name,
            preferred_category,
        }
    }

    fn to_raw(&self, categories: &[String]) -> RawConfig {
        let category = self
            .category
            .and_then(|idx| categories.get(idx))
            .cloned()
            .unwrap_or_default();
        RawConfig::new(self.name.clone(), category, self.difficulty, &self.count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Setup,
    Quiz,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub machine: QuizMachine<ThreadClock>,
    worker: FetchWorker,
    pub form: SetupForm,
    pub screen: Screen,
    pub highlighted: usize,
    pub notice: Option<String>,
    pub categories_loading: bool,
    pub summary: Option<ResultSummary>,
    resolved_at: Option<Instant>,
    dwell: Duration,
}

impl App {
    pub fn new(
        machine: QuizMachine<ThreadClock>,
        worker: FetchWorker,
        cfg: &Config,
        preferred_category: Option<String>,
    ) -> Self {
        worker.load_categories();
        Self {
            machine,
            worker,
            form: SetupForm::new(cfg, preferred_category),
            screen: Screen::Setup,
            highlighted: 0,
            notice: None,
            categories_loading: true,
            summary: None,
            resolved_at: None,
            dwell: cfg.dwell(),
        }
    }

    pub fn handle(&mut self, event: QuizEvent) -> Flow {
        match event {
            QuizEvent::Key(key) => return self.on_key(key),
            QuizEvent::Resize => {}
            QuizEvent::Tick(handle) => {
                if let TickOutcome::Expired(_) = self.machine.clock_tick(handle) {
                    self.resolved_at = Some(Instant::now());
                }
            }
            QuizEvent::Categories(result) => self.on_categories(result),
            QuizEvent::Question { id, result } => match self.machine.deliver(id, result) {
                Ok(Delivery::Presented) => {
                    self.highlighted = 0;
                    self.notice = None;
                }
                Ok(Delivery::Discarded) => {}
                Err(e) => self.report(&e),
            },
            QuizEvent::Idle => {
                if self
                    .resolved_at
                    .is_some_and(|at| at.elapsed() >= self.dwell)
                {
                    self.advance();
                }
            }
        }
        Flow::Continue
    }

    fn on_categories(&mut self, result: Result<Vec<String>, SourceError>) {
        self.categories_loading = false;
        match result {
            Ok(categories) => {
                let preferred = self
                    .form
                    .preferred_category
                    .as_ref()
                    .and_then(|p| categories.iter().position(|c| c.eq_ignore_ascii_case(p)));
                self.form.category = preferred.or(if categories.is_empty() { None } else { Some(0) });
                self.machine.set_categories(categories);
            }
            Err(e) => {
                warn!(error = %e, "could not load categories");
                self.notice = Some(format!("{e} (press F5 to reload)"));
            }
        }
    }

    fn report(&mut self, err: &QuizError) {
        if !err.is_retryable() {
            warn!(error = %err, "unexpected engine error");
        }
        self.notice = Some(err.to_string());
    }

    fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }
        match self.screen {
            Screen::Setup => self.on_setup_key(key),
            Screen::Quiz => self.on_quiz_key(key),
            Screen::Results => self.on_results_key(key),
        }
    }

    fn on_setup_key(&mut self, key: KeyEvent) -> Flow {
        let form = &mut self.form;
        match key.code {
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
            KeyCode::F(5) => {
                self.categories_loading = true;
                self.notice = None;
                self.worker.load_categories();
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Left | KeyCode::Right => {
                let forward = key.code == KeyCode::Right;
                match form.focus {
                    Field::Category => {
                        let len = self.machine.categories().len();
                        if len > 0 {
                            let idx = form.category.unwrap_or(0);
                            form.category = Some(if forward {
                                (idx + 1) % len
                            } else {
                                (idx + len - 1) % len
                            });
                        }
                    }
                    Field::Difficulty => {
                        form.difficulty = if forward {
                            form.difficulty.next()
                        } else {
                            form.difficulty.prev()
                        };
                    }
                    Field::Name | Field::Count => {}
                }
            }
            KeyCode::Backspace => match form.focus {
                Field::Name => {
                    form.name.pop();
                }
                Field::Count => {
                    form.count.pop();
                }
                _ => {}
            },
            KeyCode::Char(c) => match form.focus {
                Field::Name => form.name.push(c),
                Field::Count if c.is_ascii_digit() => form.count.push(c),
                _ => {}
            },
            _ => {}
        }
        Flow::Continue
    }

    fn submit(&mut self) {
        let raw = self.form.to_raw(self.machine.categories());
        match self.machine.submit(&raw) {
            Ok(request) => {
                self.notice = None;
                self.summary = None;
                self.highlighted = 0;
                self.resolved_at = None;
                self.screen = Screen::Quiz;
                self.worker.fetch(request);
            }
            Err(e) => self.report(&e),
        }
    }

    fn on_quiz_key(&mut self, key: KeyEvent) -> Flow {
        let options = self
            .machine
            .state()
            .and_then(|s| s.current())
            .map(|q| (q.presented().options().to_vec(), q.is_pending()));

        match (key.code, options) {
            (KeyCode::Esc, _) => self.stop(),
            (KeyCode::Char('r'), None) => match self.machine.retry() {
                Ok(request) => {
                    self.notice = None;
                    self.worker.fetch(request);
                }
                Err(e) => debug!(error = %e, "nothing to retry"),
            },
            (KeyCode::Up, Some((opts, true))) => {
                self.highlighted = (self.highlighted + opts.len() - 1) % opts.len();
            }
            (KeyCode::Down, Some((opts, true))) => {
                self.highlighted = (self.highlighted + 1) % opts.len();
            }
            (KeyCode::Enter | KeyCode::Char(' '), Some((opts, true))) => {
                if let Some(option) = opts.get(self.highlighted) {
                    self.answer(option);
                }
            }
            (KeyCode::Char(c), Some((opts, true))) if c.is_ascii_digit() => {
                let picked = c
                    .to_digit(10)
                    .and_then(|d| (d as usize).checked_sub(1))
                    .and_then(|idx| opts.get(idx));
                if let Some(option) = picked {
                    self.answer(option);
                }
            }
            (KeyCode::Enter | KeyCode::Char(' '), Some((_, false))) => self.advance(),
            _ => {}
        }
        Flow::Continue
    }

    fn answer(&mut self, option: &str) {
        match self.machine.answer(option) {
            Ok(AnswerOutcome::Recorded(_)) => self.resolved_at = Some(Instant::now()),
            Ok(AnswerOutcome::AlreadyResolved) => {}
            Err(e) => self.report(&e),
        }
    }

    fn advance(&mut self) {
        self.resolved_at = None;
        match self.machine.advance() {
            Ok(Advance::Next(request)) => self.worker.fetch(request),
            Ok(Advance::Ended) => self.show_results(),
            Err(e) => self.report(&e),
        }
    }

    fn stop(&mut self) {
        self.resolved_at = None;
        match self.machine.stop() {
            Ok(()) => self.show_results(),
            Err(e) => self.report(&e),
        }
    }

    fn show_results(&mut self) {
        match self.machine.summary() {
            Ok(summary) => {
                self.summary = Some(summary);
                self.screen = Screen::Results;
            }
            Err(e) => self.report(&e),
        }
    }

    fn on_results_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Char('r') | KeyCode::Enter => {
                self.machine.restart();
                self.summary = None;
                self.screen = Screen::Setup;
                self.form.focus = Field::Name;
            }
            _ => {}
        }
        Flow::Continue
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);

    let log_config = LogConfig::from_verbosity(cli.verbose).with_log_file(AppDirs::log_path());
    if let Err(e) = init_logging(&log_config) {
        eprintln!("logging disabled: {e}");
    }

    if cli.save_config {
        store.save(&config)?;
    }

    let mut source = make_source(&config)?;

    if cli.list_categories {
        for category in source.list_categories()? {
            println!("{category}");
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (events, tx) = ChannelEventSource::with_terminal();
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(POLL_INTERVAL_MS)));
    let machine = QuizMachine::new(ThreadClock::new(tx.clone()), config.engine_settings());
    let worker = FetchWorker::spawn(source, tx);
    let mut app = App::new(machine, worker, &config, cli.category.clone());

    let result = start_tui(&mut terminal, &runner, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: QuizEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    runner: &Runner<E, T>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        if app.handle(runner.step()) == Flow::Quit {
            break;
        }
    }
    Ok(())
}
