mod app;
mod braille;
mod ui;

use anyhow::{Context, Result};
use app::{App, Focus};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dla_lattice::config::AppConfig;
use dla_lattice::settings::SpawnMode;
use dla_lattice::Neighborhood;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dla-lattice")]
#[command(about = "Lattice Diffusion-Limited Aggregation in the terminal")]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Lattice width in cells (defaults to fitting the terminal)
    #[arg(long)]
    width: Option<usize>,

    /// Lattice height in cells (defaults to fitting the terminal)
    #[arg(long)]
    height: Option<usize>,

    /// Walkers per spawn (1-100000)
    #[arg(short = 'w', long)]
    walkers: Option<usize>,

    /// Neighborhood tested for sticking (vonneumann, moore)
    #[arg(long)]
    neighborhood: Option<String>,

    /// Spawn mode (border, square)
    #[arg(long = "spawn-mode")]
    spawn_mode: Option<String>,

    /// Fixed rng seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Simulation speed (steps per frame, 1-500)
    #[arg(long)]
    speed: Option<usize>,

    /// Write tracing output to this file (filtered by RUST_LOG, default info)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn parse_neighborhood(s: &str) -> Neighborhood {
    match s.to_lowercase().as_str() {
        "vonneumann" | "von-neumann" | "vn" | "4" => Neighborhood::VonNeumann,
        _ => Neighborhood::Moore,
    }
}

fn parse_spawn_mode(s: &str) -> SpawnMode {
    match s.to_lowercase().as_str() {
        "square" | "sq" => SpawnMode::Square,
        _ => SpawnMode::Border,
    }
}

/// The terminal is owned by the UI, so logs only go to a file when asked
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn apply_args(config: &mut AppConfig, args: &Args) {
    let settings = &mut config.settings;
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if let Some(walkers) = args.walkers {
        settings.num_walkers = walkers.clamp(1, 100_000);
    }
    if let Some(neighborhood) = &args.neighborhood {
        settings.neighborhood = parse_neighborhood(neighborhood);
    }
    if let Some(mode) = &args.spawn_mode {
        settings.spawn_mode = parse_spawn_mode(mode);
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    if let Some(speed) = args.speed {
        config.steps_per_frame = speed.clamp(1, 500);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let config_path = args.config.clone().or_else(AppConfig::default_path);
    let mut config = match &config_path {
        Some(path) => AppConfig::load_or_default(path),
        None => AppConfig::default(),
    };
    apply_args(&mut config, &args);

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Get initial terminal size and create app
    let size = terminal.size()?;
    let frame_rect = ratatui::layout::Rect {
        x: 0,
        y: 0,
        width: size.width,
        height: size.height,
    };
    let (canvas_width, canvas_height) = ui::get_canvas_size(frame_rect, false);

    let res = App::new(canvas_width, canvas_height, config, config_path).and_then(|mut app| {
        info!(
            width = app.simulation.width(),
            height = app.simulation.height(),
            "starting"
        );
        run_app(&mut terminal, &mut app)
    });

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    // Target ~60fps for smooth animation
    const FRAME_DURATION: Duration = Duration::from_millis(16);

    loop {
        // Render current state
        terminal.draw(|frame| ui::render(frame, app))?;

        // Poll for events with timeout
        if event::poll(FRAME_DURATION)? {
            match event::read()? {
                Event::Key(key) => {
                    // Only process Press events
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    // Handle Ctrl+C
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        return Ok(());
                    }

                    let stride = if key.modifiers.contains(KeyModifiers::SHIFT) {
                        10
                    } else {
                        1
                    };

                    match key.code {
                        // System controls
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char(' ') => app.toggle_running(),
                        KeyCode::Char('r') | KeyCode::Char('R') => app.reset(),
                        KeyCode::Char('s') | KeyCode::Char('S') => app.spawn_walkers(),
                        KeyCode::Char('f') | KeyCode::Char('F') => app.start_bulk_run(),
                        KeyCode::Char('b') | KeyCode::Char('B') => app.brush(),
                        KeyCode::Char('x') | KeyCode::Char('X') => app.erase(),
                        KeyCode::Char('w') | KeyCode::Char('W') => app.save_config(),
                        KeyCode::Char('v') | KeyCode::Char('V') => app.toggle_fullscreen(),
                        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => {
                            app.toggle_help()
                        }
                        KeyCode::Char('+') | KeyCode::Char('=') => {
                            app.increase_speed();
                            app.focus = Focus::Speed;
                        }
                        KeyCode::Char('-') | KeyCode::Char('_') => {
                            app.decrease_speed();
                            app.focus = Focus::Speed;
                        }
                        KeyCode::Char('n') | KeyCode::Char('N') => {
                            app.cycle_neighborhood();
                            app.focus = Focus::Neighborhood;
                        }
                        KeyCode::Char('m') | KeyCode::Char('M') => {
                            app.cycle_spawn_mode();
                            app.focus = Focus::Spawn;
                        }

                        // Navigation
                        KeyCode::Tab => app.next_focus(),
                        KeyCode::BackTab => app.prev_focus(),
                        KeyCode::Up if !app.show_help => {
                            if app.focus.is_param() {
                                app.adjust_focused(true);
                            } else {
                                app.move_cursor(0, -stride);
                            }
                        }
                        KeyCode::Down if !app.show_help => {
                            if app.focus.is_param() {
                                app.adjust_focused(false);
                            } else {
                                app.move_cursor(0, stride);
                            }
                        }
                        KeyCode::Left if !app.focus.is_param() => app.move_cursor(-stride, 0),
                        KeyCode::Right if !app.focus.is_param() => app.move_cursor(stride, 0),
                        KeyCode::Esc => {
                            if app.show_help {
                                app.toggle_help();
                            } else if app.is_busy() {
                                app.cancel_bulk_run();
                            } else if app.focus.is_param() {
                                app.focus = Focus::Cursor;
                            }
                        }
                        KeyCode::Char('j') | KeyCode::Char('J') => {
                            if app.show_help {
                                app.scroll_help_down(ui::HELP_CONTENT_LINES);
                            }
                        }
                        KeyCode::Char('k') | KeyCode::Char('K') => {
                            if app.show_help {
                                app.scroll_help_up();
                            }
                        }
                        _ => {}
                    }
                }
                Event::Resize(width, height) => {
                    let (canvas_width, canvas_height) = ui::get_canvas_size(
                        ratatui::layout::Rect {
                            x: 0,
                            y: 0,
                            width,
                            height,
                        },
                        app.fullscreen_mode,
                    );
                    app.resize(canvas_width, canvas_height);
                }
                _ => {}
            }
        }

        // Run simulation tick
        app.tick();
    }
}
