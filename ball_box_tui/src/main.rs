use anyhow::{Context, Result};
use ball_box_core::{
    EnvConfig, Environment, StepResult,
    agent::{Agent, GreedySolver, RandomWalker},
    render::{CELL_HEIGHT, CELL_WIDTH, Sprite},
};
use clap::{Parser, ValueEnum};
use ratatui::{
    crossterm::{
        self,
        event::{self, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Registered environment id
    #[arg(short, long, default_value = "PutBallInBoxEnvFixed8x8-v0")]
    env: String,

    /// Override the grid width
    #[arg(long)]
    width: Option<usize>,

    /// Override the grid height
    #[arg(long)]
    height: Option<usize>,

    /// Resample the initial state every episode
    #[arg(long)]
    random: bool,

    /// Seed for the environment and the agent
    #[arg(short, long)]
    seed: Option<u64>,

    /// Which agent drives the environment
    #[arg(short, long, value_enum, default_value_t = AgentKind::Greedy)]
    agent: AgentKind,

    /// Milliseconds between simulation steps
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Run without a terminal UI and log episode summaries
    #[arg(long)]
    headless: bool,

    /// Episodes to play in headless mode
    #[arg(long, default_value_t = 10)]
    episodes: u64,

    /// Truncate an episode after this many steps in headless mode
    #[arg(long, default_value_t = 1000)]
    max_steps: u64,

    /// Write logs here in TUI mode
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AgentKind {
    Random,
    Greedy,
}

/// Where log records end up.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    /// Headless runs own the terminal's stderr.
    Stderr,
    /// TUI runs given `--log-file`.
    File(PathBuf),
    /// TUI runs without a file; stderr would draw over the alternate screen.
    Discard,
}

impl Args {
    /// Builds the environment config from the preset id and any overrides.
    fn config(&self) -> Result<EnvConfig> {
        let mut config = EnvConfig::from_id(&self.env)
            .with_context(|| format!("Unknown environment '{}'", self.env))?;
        if let Some(width) = self.width {
            config.space_size.0 = width;
        }
        if let Some(height) = self.height {
            config.space_size.1 = height;
        }
        if self.random {
            config.fixed_initial_state = false;
        }
        Ok(config)
    }

    /// Picks the log destination for this run.
    fn log_target(&self) -> LogTarget {
        match (&self.log_file, self.headless) {
            (_, true) => LogTarget::Stderr,
            (Some(path), false) => LogTarget::File(path.clone()),
            (None, false) => LogTarget::Discard,
        }
    }
}

struct App {
    /// The simulated environment.
    environment: Environment,
    /// Picks an action every tick.
    agent: Box<dyn Agent>,
    /// Most recent step outcome.
    last_step: Option<StepResult>,
    /// Sum of rewards in the running episode.
    episode_return: f32,
    /// Episodes that ended with the ball in the box.
    solved: u64,
    /// Flag to stop ticking without leaving the UI.
    paused: bool,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    /// Builds the environment and agent and starts the first episode.
    fn new(config: EnvConfig, kind: AgentKind, seed: u64) -> Result<Self> {
        let mut environment =
            Environment::with_seed(config, seed).context("Failed to create environment")?;
        environment.reset()?;
        // Walker seed differs from the environment seed
        let agent: Box<dyn Agent> = match kind {
            AgentKind::Random => Box::new(RandomWalker::new(seed.wrapping_add(1))),
            AgentKind::Greedy => Box::new(GreedySolver),
        };
        Ok(App {
            environment,
            agent,
            last_step: None,
            episode_return: 0.0,
            solved: 0,
            paused: false,
            should_quit: false,
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Result<()> {
        if self.paused {
            return Ok(());
        }
        let action = self
            .agent
            .act(self.environment.state(), self.environment.config());
        let result = self.environment.step(action)?;
        // A done step already belongs to the next episode inside the environment
        self.episode_return += result.reward;
        if result.done {
            self.solved += 1;
            info!(
                episode = result.info.episode,
                steps = result.info.step,
                episode_return = self.episode_return,
                "episode solved"
            );
            self.episode_return = 0.0;
        }
        self.last_step = Some(result);
        Ok(())
    }

    /// Abandons the running episode and starts a new one.
    fn reset(&mut self) -> Result<()> {
        self.last_step = Some(self.environment.reset()?);
        self.episode_return = 0.0;
        Ok(())
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let config = args.config()?;
    // Fall back to a fresh seed when none is given
    let seed = args.seed.unwrap_or_else(rand::random);

    init_logging(&args.log_target())?;

    if args.headless {
        return run_headless(&args, config, seed);
    }

    // Create the application state
    let mut app = App::new(config, args.agent, seed)?;

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));

    // Restore the terminal state, even if the loop failed
    restore_terminal(&mut terminal)?;

    result
}

/// Installs the global subscriber for `target`.
fn init_logging(target: &LogTarget) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
        LogTarget::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // No subscriber: every event is dropped at the call site.
        LogTarget::Discard => {}
    }
    Ok(())
}

/// Plays episodes without a UI, truncating long ones.
fn run_headless(args: &Args, config: EnvConfig, seed: u64) -> Result<()> {
    let mut app = App::new(config, args.agent, seed)?;
    info!(?config, seed, agent = ?args.agent, "headless run");

    for episode in 1..=args.episodes {
        let mut steps = 0;
        // The environment resets itself on success, so only truncation needs
        // an explicit reset
        let done = loop {
            app.tick()?;
            steps += 1;
            if app.last_step.is_some_and(|s| s.done) {
                break true;
            }
            if steps >= args.max_steps {
                break false;
            }
        };
        if !done {
            info!(
                episode,
                steps,
                episode_return = app.episode_return,
                "episode truncated"
            );
            app.reset()?;
        }
    }
    info!(solved = app.solved, episodes = args.episodes, "headless run finished");
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        // Draw the UI
        terminal.draw(|f| ui(f, app))?;

        // Calculate timeout for event polling
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        // Poll for key presses
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.paused = !app.paused,
                    KeyCode::Char('r') => app.reset()?,
                    _ => {}
                }
            }
        }

        // Advance the simulation once per tick
        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }

        // Exit loop if requested
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70),
            Constraint::Percentage(20),
            Constraint::Percentage(10),
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &app.environment);
    render_stats(frame, main_layout[1], app);

    let help = if app.paused {
        "Paused. 'space' resume, 'r' reset, 'q' quit."
    } else {
        "'space' pause, 'r' reset, 'q' or 'Esc' quit."
    };
    let help_text = Paragraph::new(help)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders episode counters and the latest observation.
fn render_stats(frame: &mut Frame, area: Rect, app: &App) {
    let env = &app.environment;
    let (reward, done) = app
        .last_step
        .map(|s| (s.reward, s.done))
        .unwrap_or((0.0, false));

    let lines = vec![
        Line::from(format!(
            "Episode: {}  Step: {}  Solved: {}",
            env.episode_count(),
            env.step_count(),
            app.solved
        )),
        Line::from(format!(
            "Last reward: {reward:+.1}  Return: {:+.1}  Done: {done}",
            app.episode_return
        )),
        Line::from(format!("Observation: {:?}", env.observation())),
    ];

    let title = env.config().id().unwrap_or_else(|| "custom".to_string());
    let stats = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(stats, area);
}

/// Renders the sprite raster onto the frame.
fn render_map(frame: &mut Frame, area: Rect, environment: &Environment) {
    let block = Block::default().title("Put Ball In Box").borders(Borders::ALL);
    let raster = match environment.render() {
        Ok(raster) => raster,
        Err(e) => {
            // Only reachable if the environment let a position leave the grid
            let message = Paragraph::new(e.to_string()).block(block);
            frame.render_widget(message, area);
            return;
        }
    };

    let mut lines: Vec<Line> = Vec::with_capacity(raster.height());
    for y in 0..raster.height() {
        // Shade alternate lattice cells so cell borders are visible
        let shade = if (y / CELL_HEIGHT) % 2 == 0 {
            Color::Reset
        } else {
            Color::DarkGray
        };
        let mut spans: Vec<Span> = Vec::with_capacity(raster.width());
        for x in 0..raster.width() {
            let bg = if (x / CELL_WIDTH) % 2 == 0 {
                shade
            } else {
                checker(shade)
            };
            let (glyph, fg) = match raster.get(x, y).unwrap_or(&Sprite::Empty) {
                Sprite::Empty => (" ", Color::Reset),
                Sprite::Agent => ("@", Color::Red),
                Sprite::Ball => ("o", Color::Yellow),
                Sprite::Box => ("#", Color::Cyan),
            };
            spans.push(Span::styled(glyph, Style::default().fg(fg).bg(bg).bold()));
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Alternates cell backgrounds so cell borders are visible.
fn checker(shade: Color) -> Color {
    match shade {
        Color::Reset => Color::DarkGray,
        _ => Color::Reset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_build_config() {
        let args = Args::parse_from(["ball_box_tui", "--env", "PutBallInBoxEnvRandom5x5-v0"]);
        assert_eq!(args.config().unwrap(), EnvConfig::random(5));

        let args = Args::parse_from(["ball_box_tui", "--width", "4", "--height", "6", "--random"]);
        assert_eq!(args.config().unwrap(), EnvConfig::new(false, 4, 6));

        let args = Args::parse_from(["ball_box_tui", "--env", "Nope-v0"]);
        assert!(args.config().is_err());
    }

    #[test]
    fn test_log_target_per_mode() {
        let args = Args::parse_from(["ball_box_tui"]);
        assert_eq!(args.log_target(), LogTarget::Discard);

        let args = Args::parse_from(["ball_box_tui", "--log-file", "run.log"]);
        assert_eq!(args.log_target(), LogTarget::File(PathBuf::from("run.log")));

        let args = Args::parse_from(["ball_box_tui", "--headless"]);
        assert_eq!(args.log_target(), LogTarget::Stderr);

        let args = Args::parse_from(["ball_box_tui", "--headless", "--log-file", "run.log"]);
        assert_eq!(args.log_target(), LogTarget::Stderr);
    }

    #[test]
    fn test_app_ticks_until_solved() {
        let mut app = App::new(EnvConfig::fixed(5), AgentKind::Greedy, 3).unwrap();
        for _ in 0..12 {
            app.tick().unwrap();
        }
        assert!(app.solved >= 1);

        app.paused = true;
        let before = app.environment.step_count();
        app.tick().unwrap();
        assert_eq!(app.environment.step_count(), before);
    }
}
