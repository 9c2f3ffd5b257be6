use crate::error::{DlaError, Result};
use crate::geometry::Neighborhood;
use crate::spawn::{SpawnConfig, SquareRegion, DEFAULT_EDGE_MARGIN};
use crate::worker::DEFAULT_PROGRESS_INTERVAL;
use serde::{Deserialize, Serialize};

/// Spawn mode - where new walkers appear
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum SpawnMode {
    /// Spawn along the lattice edges (classic DLA)
    #[default]
    Border,
    /// Spawn inside an offset, rotated square
    Square,
}

impl SpawnMode {
    pub fn name(&self) -> &str {
        match self {
            SpawnMode::Border => "Border",
            SpawnMode::Square => "Square",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SpawnMode::Border => SpawnMode::Square,
            SpawnMode::Square => SpawnMode::Border,
        }
    }

    pub fn prev(&self) -> Self {
        self.next()
    }
}

/// All simulation settings consolidated into one struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    // === Lattice ===
    /// Lattice width in cells (0 = fit the terminal)
    pub width: usize,
    /// Lattice height in cells (0 = fit the terminal)
    pub height: usize,
    /// Neighbor set tested for sticking
    pub neighborhood: Neighborhood,

    // === Spawn Parameters ===
    pub spawn_mode: SpawnMode,
    /// Walkers per spawn (1-100000)
    pub num_walkers: usize,
    /// Cells kept clear at each end of an edge for border spawns
    pub edge_margin: usize,
    /// Square spawn region
    pub square: SquareRegion,

    // === Tools ===
    /// Brush radius in cells (1-50)
    pub brush_radius: u32,
    /// Walkers per brush dab (1-10000)
    pub brush_walkers: usize,
    /// Eraser radius in cells (1-200)
    pub eraser_radius: u32,

    // === Bulk runs ===
    /// Ticks between worker progress reports
    pub progress_interval: u64,
    /// Fixed rng seed; random when absent
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            neighborhood: Neighborhood::default(),
            spawn_mode: SpawnMode::default(),
            num_walkers: 2000,
            edge_margin: DEFAULT_EDGE_MARGIN,
            square: SquareRegion::default(),
            brush_radius: 10,
            brush_walkers: 100,
            eraser_radius: 10,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            seed: None,
        }
    }
}

impl SimulationSettings {
    /// Spawn configuration for the current mode
    pub fn spawn_config(&self) -> SpawnConfig {
        match self.spawn_mode {
            SpawnMode::Border => SpawnConfig::Border {
                count: self.num_walkers,
                margin: self.edge_margin,
            },
            SpawnMode::Square => SpawnConfig::Square {
                count: self.num_walkers,
                region: self.square,
            },
        }
    }

    /// Reject settings that can never produce a simulation
    pub fn validate(&self) -> Result<()> {
        let problem = if self.width > i32::MAX as usize || self.height > i32::MAX as usize {
            Some("lattice dimensions must fit in i32 coordinates")
        } else if self.num_walkers == 0 {
            Some("walker count must be positive")
        } else if self.square.size == 0 {
            Some("spawn square size must be positive")
        } else if self.brush_radius == 0 || self.brush_walkers == 0 {
            Some("brush radius and walker count must be positive")
        } else if self.eraser_radius == 0 {
            Some("eraser radius must be positive")
        } else if self.progress_interval == 0 {
            Some("progress interval must be positive")
        } else {
            None
        };
        match problem {
            Some(msg) => Err(DlaError::InvalidConfiguration(msg.to_string())),
            None => Ok(()),
        }
    }

    /// Adjust walkers per spawn within bounds
    pub fn adjust_num_walkers(&mut self, delta: i64) {
        self.num_walkers = (self.num_walkers as i64 + delta).clamp(1, 100_000) as usize;
    }

    /// Adjust spawn square size within bounds
    pub fn adjust_square_size(&mut self, delta: i64) {
        self.square.size = (self.square.size as i64 + delta).clamp(1, 4000) as usize;
    }

    /// Adjust spawn square rotation (wraps around)
    pub fn adjust_rotation(&mut self, delta: f64) {
        self.square.rotation_degrees = (self.square.rotation_degrees + delta).rem_euclid(360.0);
    }

    pub fn adjust_x_offset(&mut self, delta: i32) {
        self.square.x_offset = self.square.x_offset.saturating_add(delta);
    }

    pub fn adjust_y_offset(&mut self, delta: i32) {
        self.square.y_offset = self.square.y_offset.saturating_add(delta);
    }

    /// Adjust brush radius within bounds
    pub fn adjust_brush_radius(&mut self, delta: i64) {
        self.brush_radius = (self.brush_radius as i64 + delta).clamp(1, 50) as u32;
    }

    /// Adjust eraser radius within bounds
    pub fn adjust_eraser_radius(&mut self, delta: i64) {
        self.eraser_radius = (self.eraser_radius as i64 + delta).clamp(1, 200) as u32;
    }
}
