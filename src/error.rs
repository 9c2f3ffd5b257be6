use crate::geometry::Point;
use thiserror::Error;

/// Errors raised by the DLA engine
#[derive(Debug, Error)]
pub enum DlaError {
    /// A caller broke one of the cluster tree's invariants
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Parameters that can never produce a valid simulation
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A bulk run gave up before every walker stuck
    #[error("step limit of {limit} reached with {remaining} walkers still active")]
    StepLimitExceeded { limit: u64, remaining: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

impl DlaError {
    pub(crate) fn missing_parent(point: Point, parent: Point) -> Self {
        DlaError::InvariantViolation(format!(
            "parent {} of {} is not part of the cluster",
            parent, point
        ))
    }

    pub(crate) fn duplicate(point: Point) -> Self {
        DlaError::InvariantViolation(format!("{} is already part of the cluster", point))
    }

    pub(crate) fn out_of_bounds(point: Point, width: usize, height: usize) -> Self {
        DlaError::InvariantViolation(format!(
            "{} lies outside the {}x{} lattice",
            point, width, height
        ))
    }

    /// Lattice sides must be positive and addressable by `i32` coordinates
    pub(crate) fn check_dimensions(width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(DlaError::InvalidConfiguration(format!(
                "lattice dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let limit = i32::MAX as usize;
        if width > limit || height > limit {
            return Err(DlaError::InvalidConfiguration(format!(
                "lattice dimensions must not exceed {}, got {}x{}",
                limit, width, height
            )));
        }
        Ok(())
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, DlaError::InvariantViolation(_))
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, DlaError::InvalidConfiguration(_))
    }
}

pub type Result<T> = std::result::Result<T, DlaError>;
