//! Diffusion-Limited Aggregation on an integer lattice.
//!
//! Walkers random-walk one cell per tick until they touch the cluster, then
//! stick and record which entry they stuck to. [`SimulationState::step`] is the
//! interactive path; [`worker`] runs the same step function to completion on a
//! background thread.

pub mod cluster;
pub mod config;
pub mod error;
pub mod geometry;
pub mod settings;
pub mod simulation;
pub mod spawn;
pub mod worker;

pub use cluster::{ClusterEntry, ClusterStore, DistanceStats, Parent};
pub use error::{DlaError, Result};
pub use geometry::{Direction, Neighborhood, Point, PointKey};
pub use simulation::{EraseReport, SimulationSnapshot, SimulationState, StepReport};
pub use spawn::{
    spawn_border, spawn_border_with_margin, spawn_brush, spawn_square, SpawnConfig, SquareRegion,
};
pub use worker::{SimulateRequest, WorkerHandle, WorkerMessage};
