use crate::braille;
use anyhow::Result;
use dla_lattice::config::AppConfig;
use dla_lattice::settings::SimulationSettings;
use dla_lattice::spawn::spawn_brush;
use dla_lattice::worker::{SimulateRequest, WorkerHandle, WorkerMessage};
use dla_lattice::{Point, SimulationState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::{info, warn};

/// Focus state for parameter editing in the sidebar
/// Alphabetically ordered for consistent UI display
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Focus {
    /// Arrow keys move the tool cursor
    #[default]
    Cursor,
    // Alphabetical order
    Brush,
    Eraser,
    Neighborhood,
    Rotation,
    Size,
    Spawn,
    Speed,
    Walkers,
    XOffset,
    YOffset,
}

impl Focus {
    /// Tab cycles through parameters in alphabetical order
    pub fn next(&self) -> Focus {
        match self {
            Focus::Cursor => Focus::Brush,
            Focus::Brush => Focus::Eraser,
            Focus::Eraser => Focus::Neighborhood,
            Focus::Neighborhood => Focus::Rotation,
            Focus::Rotation => Focus::Size,
            Focus::Size => Focus::Spawn,
            Focus::Spawn => Focus::Speed,
            Focus::Speed => Focus::Walkers,
            Focus::Walkers => Focus::XOffset,
            Focus::XOffset => Focus::YOffset,
            Focus::YOffset => Focus::Brush, // Loop back
        }
    }

    /// Shift+Tab cycles through parameters in reverse alphabetical order
    pub fn prev(&self) -> Focus {
        match self {
            Focus::Cursor => Focus::YOffset,
            Focus::Brush => Focus::YOffset, // Loop back
            Focus::Eraser => Focus::Brush,
            Focus::Neighborhood => Focus::Eraser,
            Focus::Rotation => Focus::Neighborhood,
            Focus::Size => Focus::Rotation,
            Focus::Spawn => Focus::Size,
            Focus::Speed => Focus::Spawn,
            Focus::Walkers => Focus::Speed,
            Focus::XOffset => Focus::Walkers,
            Focus::YOffset => Focus::XOffset,
        }
    }

    /// Line index in the parameters box
    pub fn line_index(&self) -> u16 {
        match self {
            Focus::Cursor | Focus::Brush => 0,
            Focus::Eraser => 1,
            Focus::Neighborhood => 2,
            Focus::Rotation => 3,
            Focus::Size => 4,
            Focus::Spawn => 5,
            Focus::Speed => 6,
            Focus::Walkers => 7,
            Focus::XOffset => 8,
            Focus::YOffset => 9,
        }
    }

    pub fn is_param(&self) -> bool {
        !matches!(self, Focus::Cursor)
    }
}

/// Progress of a background run-to-completion
pub struct BulkRun {
    pub worker: WorkerHandle,
    pub steps: u64,
    pub walker_count: usize,
    /// Latest walker positions streamed by the worker, for live drawing
    pub walkers: Option<Vec<Point>>,
}

/// Main application state
pub struct App {
    pub simulation: SimulationState,
    pub settings: SimulationSettings,
    pub rng: StdRng,
    pub running: bool,
    pub bulk: Option<BulkRun>,
    pub cursor: Point,
    pub focus: Focus,
    pub steps_per_frame: usize,
    pub fullscreen_mode: bool,
    pub show_help: bool,
    pub help_scroll: u16,
    pub status: String,
    pub config_path: Option<PathBuf>,
}

impl App {
    pub fn new(
        canvas_width: u16,
        canvas_height: u16,
        config: AppConfig,
        config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let settings = config.settings;
        settings.validate()?;
        let (width, height) = lattice_size(&settings, canvas_width, canvas_height);
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let simulation = SimulationState::new(width, height, settings.neighborhood)?;

        let mut app = Self {
            cursor: Point::center_of(width, height),
            simulation,
            settings,
            rng,
            running: false,
            bulk: None,
            focus: Focus::Cursor,
            steps_per_frame: config.steps_per_frame.clamp(1, 500),
            fullscreen_mode: false,
            show_help: false,
            help_scroll: 0,
            status: String::new(),
            config_path,
        };
        app.spawn_walkers();
        Ok(app)
    }

    /// Run simulation steps for current frame
    pub fn tick(&mut self) {
        self.poll_bulk_run();
        if !self.running || self.bulk.is_some() {
            return;
        }
        for _ in 0..self.steps_per_frame {
            self.simulation.step(&mut self.rng);
            if self.simulation.is_finished() {
                self.running = false;
                self.status = "all walkers stuck".to_string();
                break;
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.bulk.is_some()
    }

    /// Walkers to draw: the worker's live view during a bulk run
    pub fn visible_walkers(&self) -> &[Point] {
        match &self.bulk {
            Some(BulkRun {
                walkers: Some(walkers),
                ..
            }) => walkers,
            Some(_) => &[],
            None => self.simulation.walkers(),
        }
    }

    pub fn toggle_running(&mut self) {
        if self.is_busy() {
            return;
        }
        self.running = !self.running && !self.simulation.is_finished();
    }

    /// Reset to a lone seed
    pub fn reset(&mut self) {
        self.cancel_bulk_run();
        self.running = false;
        match self.simulation.reset() {
            Ok(()) => self.status = "reset".to_string(),
            Err(err) => self.report(err),
        }
    }

    /// Spawn walkers according to the current spawn mode
    pub fn spawn_walkers(&mut self) {
        if self.is_busy() {
            return;
        }
        let spawn = self.settings.spawn_config();
        match spawn.generate(self.simulation.width(), self.simulation.height(), &mut self.rng) {
            Ok(walkers) => {
                self.status = format!(
                    "spawned {} walkers ({})",
                    walkers.len(),
                    self.settings.spawn_mode.name()
                );
                self.simulation.add_walkers(walkers);
            }
            Err(err) => self.report(err),
        }
    }

    /// Paint a dab of walkers around the cursor
    pub fn brush(&mut self) {
        if self.is_busy() {
            return;
        }
        let result = spawn_brush(
            self.simulation.width(),
            self.simulation.height(),
            self.settings.brush_walkers,
            self.cursor,
            self.settings.brush_radius,
            &mut self.rng,
        );
        match result {
            Ok(walkers) => {
                self.status = format!("brushed {} walkers", walkers.len());
                self.simulation.add_walkers(walkers);
            }
            Err(err) => self.report(err),
        }
    }

    /// Erase cluster branches and walkers around the cursor
    pub fn erase(&mut self) {
        if self.is_busy() {
            return;
        }
        let report = self
            .simulation
            .erase_within(self.cursor, self.settings.eraser_radius);
        self.status = format!(
            "erased {} entries, {} walkers",
            report.entries, report.walkers
        );
    }

    /// Hand the current state to a background worker
    pub fn start_bulk_run(&mut self) {
        if self.is_busy() || self.simulation.is_finished() {
            return;
        }
        self.running = false;
        let request = SimulateRequest::new(&self.simulation)
            .with_progress_interval(self.settings.progress_interval)
            .with_positions(true)
            .with_seed(self.settings.seed);

        match WorkerHandle::spawn(request) {
            Ok(worker) => {
                info!(walkers = self.simulation.walkers().len(), "bulk run started");
                self.status = "simulating to completion".to_string();
                self.bulk = Some(BulkRun {
                    worker,
                    steps: self.simulation.steps(),
                    walker_count: self.simulation.walkers().len(),
                    walkers: None,
                });
            }
            Err(err) => self.report(err),
        }
    }

    /// Abandon a running bulk run; the local state is left as it was
    pub fn cancel_bulk_run(&mut self) {
        if let Some(run) = self.bulk.take() {
            let outcome = run.worker.cancel();
            info!(?outcome, "bulk run stopped");
            self.status = "bulk run cancelled".to_string();
        }
    }

    fn poll_bulk_run(&mut self) {
        let Some(run) = self.bulk.as_mut() else {
            return;
        };

        for msg in run.worker.drain() {
            match msg {
                WorkerMessage::Progress {
                    steps,
                    walker_count,
                    walker_positions,
                } => {
                    run.steps = steps;
                    run.walker_count = walker_count;
                    if walker_positions.is_some() {
                        run.walkers = walker_positions;
                    }
                }
                WorkerMessage::Done { steps, cluster } => {
                    let size = cluster.len();
                    match self.simulation.apply_result(cluster, steps) {
                        Ok(()) => {
                            self.status = format!("done: {} entries in {} steps", size, steps)
                        }
                        Err(err) => self.status = format!("bad worker result: {}", err),
                    }
                    break;
                }
                WorkerMessage::Error { message } => {
                    warn!(%message, "bulk run failed");
                    self.status = format!("error: {}", message);
                    break;
                }
            }
        }

        if self.bulk.as_ref().is_some_and(|run| run.worker.is_finished()) {
            self.bulk = None;
        }
    }

    pub fn move_cursor(&mut self, dx: i32, dy: i32) {
        self.cursor = self
            .cursor
            .offset(dx, dy)
            .clamped(self.simulation.width(), self.simulation.height());
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused(&mut self, up: bool) {
        let sign: i64 = if up { 1 } else { -1 };
        match self.focus {
            Focus::Cursor => {}
            Focus::Brush => self.settings.adjust_brush_radius(sign),
            Focus::Eraser => self.settings.adjust_eraser_radius(sign),
            Focus::Neighborhood => self.cycle_neighborhood(),
            Focus::Rotation => self.settings.adjust_rotation(15.0 * sign as f64),
            Focus::Size => self.settings.adjust_square_size(10 * sign),
            Focus::Spawn => self.cycle_spawn_mode(),
            Focus::Speed => {
                if up {
                    self.increase_speed()
                } else {
                    self.decrease_speed()
                }
            }
            Focus::Walkers => self.settings.adjust_num_walkers(100 * sign),
            Focus::XOffset => self.settings.adjust_x_offset(5 * sign as i32),
            Focus::YOffset => self.settings.adjust_y_offset(5 * sign as i32),
        }
    }

    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn cycle_neighborhood(&mut self) {
        self.settings.neighborhood = self.settings.neighborhood.next();
        self.simulation.set_neighborhood(self.settings.neighborhood);
    }

    pub fn cycle_spawn_mode(&mut self) {
        self.settings.spawn_mode = self.settings.spawn_mode.next();
    }

    pub fn increase_speed(&mut self) {
        self.steps_per_frame = (self.steps_per_frame + 1).min(500);
    }

    pub fn decrease_speed(&mut self) {
        self.steps_per_frame = self.steps_per_frame.saturating_sub(1).max(1);
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0; // Reset scroll when opening
        }
    }

    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    /// Rebuild the lattice for a new canvas unless the size is pinned by config
    pub fn resize(&mut self, canvas_width: u16, canvas_height: u16) {
        let (width, height) = lattice_size(&self.settings, canvas_width, canvas_height);
        if width == self.simulation.width() && height == self.simulation.height() {
            return;
        }
        self.cancel_bulk_run();
        self.running = false;
        match SimulationState::new(width, height, self.settings.neighborhood) {
            Ok(simulation) => {
                self.simulation = simulation;
                self.cursor = Point::center_of(width, height);
                self.status = format!("lattice resized to {}x{}", width, height);
            }
            Err(err) => self.report(err),
        }
    }

    /// Write the current settings to the config file
    pub fn save_config(&mut self) {
        let Some(path) = self.config_path.clone() else {
            self.status = "no config path available".to_string();
            return;
        };
        let config = AppConfig {
            settings: self.settings.clone(),
            steps_per_frame: self.steps_per_frame,
            ..AppConfig::default()
        };
        match config.save_to_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "config saved");
                self.status = format!("saved {}", path.display());
            }
            Err(err) => self.report(err),
        }
    }

    fn report(&mut self, err: impl std::fmt::Display) {
        warn!(error = %err, "operation failed");
        self.status = err.to_string();
    }
}

/// Lattice size from settings, or fitted to the canvas when unset
fn lattice_size(
    settings: &SimulationSettings,
    canvas_width: u16,
    canvas_height: u16,
) -> (usize, usize) {
    let (fit_width, fit_height) = braille::calculate_simulation_size(canvas_width, canvas_height);
    let width = if settings.width > 0 { settings.width } else { fit_width };
    let height = if settings.height > 0 { settings.height } else { fit_height };
    (width, height)
}
