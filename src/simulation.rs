use crate::cluster::{ClusterEntry, ClusterStore};
use crate::error::{DlaError, Result};
use crate::geometry::{Direction, Neighborhood, Point};
use crate::spawn::SpawnConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    /// Walkers that joined the cluster this tick
    pub stuck: usize,
    /// Walkers still active afterwards
    pub remaining: usize,
}

/// What an erase removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EraseReport {
    pub entries: usize,
    pub walkers: usize,
}

/// Owned, serializable copy of a simulation, used to hand work to a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Entries in stick order
    pub cluster: Vec<ClusterEntry>,
    pub walkers: Vec<Point>,
    pub steps: u64,
}

/// Lattice DLA state: the cluster, the active walkers and the tick counter
#[derive(Debug, Clone)]
pub struct SimulationState {
    width: usize,
    height: usize,
    neighborhood: Neighborhood,
    cluster: ClusterStore,
    walkers: Vec<Point>,
    steps: u64,
}

impl SimulationState {
    /// Seed-only simulation
    pub fn new(width: usize, height: usize, neighborhood: Neighborhood) -> Result<Self> {
        Ok(Self {
            width,
            height,
            neighborhood,
            cluster: ClusterStore::new(width, height)?,
            walkers: Vec::new(),
            steps: 0,
        })
    }

    /// Seeded simulation populated according to `spawn`
    pub fn create<R: Rng>(
        width: usize,
        height: usize,
        neighborhood: Neighborhood,
        spawn: &SpawnConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let mut state = Self::new(width, height, neighborhood)?;
        state.walkers = spawn.generate(width, height, rng)?;
        Ok(state)
    }

    /// Rebuild a simulation from a snapshot, validating the cluster tree
    pub fn from_snapshot(
        width: usize,
        height: usize,
        neighborhood: Neighborhood,
        snapshot: SimulationSnapshot,
    ) -> Result<Self> {
        let cluster = ClusterStore::from_entries(width, height, snapshot.cluster)?;
        if let Some(stray) = snapshot.walkers.iter().find(|w| !w.in_bounds(width, height)) {
            return Err(DlaError::out_of_bounds(*stray, width, height));
        }
        Ok(Self {
            width,
            height,
            neighborhood,
            cluster,
            walkers: snapshot.walkers,
            steps: snapshot.steps,
        })
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            cluster: self.cluster.to_entries(),
            walkers: self.walkers.clone(),
            steps: self.steps,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    pub fn set_neighborhood(&mut self, neighborhood: Neighborhood) {
        self.neighborhood = neighborhood;
    }

    pub fn cluster(&self) -> &ClusterStore {
        &self.cluster
    }

    pub fn walkers(&self) -> &[Point] {
        &self.walkers
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// No walkers left to move
    pub fn is_finished(&self) -> bool {
        self.walkers.is_empty()
    }

    /// Append walkers, pinning any stray ones onto the lattice
    pub fn add_walkers(&mut self, walkers: impl IntoIterator<Item = Point>) {
        let (width, height) = (self.width, self.height);
        self.walkers
            .extend(walkers.into_iter().map(|w| w.clamped(width, height)));
    }

    /// Back to a lone seed with no walkers and a zeroed counter
    pub fn reset(&mut self) -> Result<()> {
        self.cluster = ClusterStore::new(self.width, self.height)?;
        self.walkers.clear();
        self.steps = 0;
        Ok(())
    }

    /// Adopt a finished worker result
    pub fn apply_result(&mut self, cluster: Vec<ClusterEntry>, steps: u64) -> Result<()> {
        self.cluster = ClusterStore::from_entries(self.width, self.height, cluster)?;
        self.walkers.clear();
        self.steps = steps;
        Ok(())
    }

    /// Remove cluster entries (with their descendants) and walkers within
    /// `radius` of `center`. The seed always survives.
    pub fn erase_within(&mut self, center: Point, radius: u32) -> EraseReport {
        let radius_sq = radius as i64 * radius as i64;
        let before = self.walkers.len();
        self.walkers
            .retain(|w| w.distance_squared(center) > radius_sq);
        EraseReport {
            entries: self.cluster.erase_within(center, radius),
            walkers: before - self.walkers.len(),
        }
    }

    /// Advance one tick with uniformly random moves
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> StepReport {
        self.step_with(|| Direction::random(rng))
    }

    /// Advance one tick, drawing each walker's move from `next_direction`.
    ///
    /// Walkers are processed in sequence order against the live cluster, so a
    /// cell claimed earlier in the tick is already visible to later walkers.
    /// A walker that lands on a cluster cell never sticks there; it stays
    /// active and moves on next tick. An empty walker list is a no-op.
    pub fn step_with<F: FnMut() -> Direction>(&mut self, mut next_direction: F) -> StepReport {
        if self.walkers.is_empty() {
            return StepReport::default();
        }

        let walkers = std::mem::take(&mut self.walkers);
        let mut active = Vec::with_capacity(walkers.len());
        let mut stuck = 0;

        for walker in walkers {
            let moved = walker
                .moved(next_direction())
                .clamped(self.width, self.height);

            let stuck_here = match self.stick_target(moved) {
                Some(parent) => self.cluster.insert(moved, parent).is_ok(),
                None => false,
            };
            if stuck_here {
                stuck += 1;
            } else {
                active.push(moved);
            }
        }

        self.walkers = active;
        self.steps += 1;
        StepReport {
            stuck,
            remaining: self.walkers.len(),
        }
    }

    /// First cluster neighbor of a free cell, in neighborhood order
    fn stick_target(&self, point: Point) -> Option<Point> {
        if self.cluster.contains(point) {
            return None;
        }
        self.neighborhood
            .neighbors(point)
            .find(|n| self.cluster.contains(*n))
    }

    /// Step until no walkers remain or `max_steps` ticks have run.
    /// Returns true when the walkers ran out.
    pub fn run_until_done<R: Rng>(&mut self, rng: &mut R, max_steps: u64) -> bool {
        let mut taken = 0;
        while !self.is_finished() && taken < max_steps {
            self.step(rng);
            taken += 1;
        }
        self.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Parent;
    use crate::spawn::{SquareRegion, DEFAULT_EDGE_MARGIN};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lone_walker(x: i32, y: i32, neighborhood: Neighborhood) -> SimulationState {
        let mut sim = SimulationState::new(10, 10, neighborhood).unwrap();
        sim.add_walkers([Point::new(x, y)]);
        sim
    }

    fn assert_tree(sim: &SimulationState) {
        for entry in sim.cluster().entries() {
            let hops = sim.cluster().ancestors(entry.point).count() as u32 - 1;
            assert_eq!(hops, entry.distance);
            let root = sim.cluster().ancestors(entry.point).last().unwrap();
            assert_eq!(root.parent, Parent::Root);
        }
    }

    #[test]
    fn test_adjacent_walker_sticks_in_one_step() {
        let mut sim = lone_walker(5, 6, Neighborhood::Moore);
        let report = sim.step_with(|| Direction::Right);

        assert_eq!(report, StepReport { stuck: 1, remaining: 0 });
        assert_eq!(sim.cluster().len(), 2);
        let entry = sim.cluster().get(Point::new(6, 6)).unwrap();
        assert_eq!(entry.distance, 1);
        assert_eq!(
            sim.cluster().parent_of(entry).unwrap().point,
            Point::new(5, 5)
        );
        assert!(sim.walkers().is_empty());
        assert_eq!(sim.steps(), 1);
    }

    #[test]
    fn test_von_neumann_ignores_diagonals() {
        let mut sim = lone_walker(5, 6, Neighborhood::VonNeumann);
        sim.step_with(|| Direction::Right);
        assert_eq!(sim.cluster().len(), 1);
        assert_eq!(sim.walkers(), &[Point::new(6, 6)]);

        let mut sim = lone_walker(5, 7, Neighborhood::VonNeumann);
        sim.step_with(|| Direction::Up);
        assert!(sim.cluster().contains(Point::new(5, 6)));
        assert!(sim.is_finished());
    }

    #[test]
    fn test_walker_landing_on_cluster_cell_keeps_walking() {
        let mut sim = lone_walker(5, 6, Neighborhood::Moore);
        sim.step_with(|| Direction::Up);
        assert_eq!(sim.cluster().len(), 1);
        assert_eq!(sim.walkers(), &[Point::new(5, 5)]);

        sim.step_with(|| Direction::Down);
        assert_eq!(sim.cluster().len(), 2);
        assert!(sim.is_finished());
    }

    #[test]
    fn test_same_tick_conflict_first_walker_wins() {
        let mut sim = SimulationState::new(10, 10, Neighborhood::Moore).unwrap();
        sim.add_walkers([Point::new(6, 7), Point::new(6, 7)]);

        let report = sim.step_with(|| Direction::Up);
        assert_eq!(report, StepReport { stuck: 1, remaining: 1 });
        assert_eq!(sim.cluster().len(), 2);
        assert_eq!(sim.walkers(), &[Point::new(6, 6)]);

        sim.step_with(|| Direction::Right);
        let late = sim.cluster().get(Point::new(7, 6)).unwrap();
        assert_eq!(late.distance, 2);
        assert!(sim.is_finished());
        assert_tree(&sim);
    }

    #[test]
    fn test_walkers_clamped_at_boundary() {
        let mut sim = SimulationState::new(10, 10, Neighborhood::Moore).unwrap();
        sim.add_walkers([Point::new(0, 0), Point::new(9, 9)]);
        sim.step_with(|| Direction::Up);
        assert_eq!(sim.walkers(), &[Point::new(0, 0), Point::new(9, 8)]);
        sim.step_with(|| Direction::Left);
        assert_eq!(sim.walkers(), &[Point::new(0, 0), Point::new(8, 8)]);
    }

    #[test]
    fn test_add_walkers_pins_strays() {
        let mut sim = SimulationState::new(10, 10, Neighborhood::Moore).unwrap();
        sim.add_walkers([Point::new(-4, 20)]);
        assert_eq!(sim.walkers(), &[Point::new(0, 9)]);
    }

    #[test]
    fn test_lattice_wider_than_i32_rejected() {
        let err = SimulationState::new(3_000_000_000, 1, Neighborhood::Moore).unwrap_err();
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn test_empty_step_is_noop() {
        let mut sim = SimulationState::new(10, 10, Neighborhood::Moore).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sim.step(&mut rng), StepReport::default());
        assert_eq!(sim.steps(), 0);
    }

    #[test]
    fn test_random_run_properties() {
        let mut rng = StdRng::seed_from_u64(42);
        let spawn = SpawnConfig::Square {
            count: 60,
            region: SquareRegion {
                size: 30,
                ..SquareRegion::default()
            },
        };
        let mut sim =
            SimulationState::create(40, 40, Neighborhood::Moore, &spawn, &mut rng).unwrap();

        let mut last_cluster = sim.cluster().len();
        let mut last_walkers = sim.walkers().len();
        let mut ticks = 0;
        while !sim.is_finished() && ticks < 2_000_000 {
            sim.step(&mut rng);
            ticks += 1;
            assert_eq!(sim.steps(), ticks);
            assert!(sim.cluster().len() >= last_cluster);
            assert!(sim.walkers().len() <= last_walkers);
            assert_eq!(sim.cluster().len() + sim.walkers().len(), 61);
            assert!(sim.walkers().iter().all(|w| w.in_bounds(40, 40)));
            last_cluster = sim.cluster().len();
            last_walkers = sim.walkers().len();
        }

        assert!(sim.is_finished());
        assert_eq!(sim.cluster().len(), 61);
        assert_tree(&sim);
    }

    #[test]
    fn test_border_walkers_terminate() {
        let mut rng = StdRng::seed_from_u64(7);
        let spawn = SpawnConfig::Border {
            count: 5,
            margin: DEFAULT_EDGE_MARGIN,
        };
        let mut sim =
            SimulationState::create(20, 20, Neighborhood::VonNeumann, &spawn, &mut rng).unwrap();
        assert!(sim.run_until_done(&mut rng, 20 * 20 * 5 * 500));
        assert_eq!(sim.cluster().len(), 6);
        assert_tree(&sim);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut rng = StdRng::seed_from_u64(3);
        let spawn = SpawnConfig::Border { count: 10, margin: 1 };
        let mut sim =
            SimulationState::create(30, 30, Neighborhood::Moore, &spawn, &mut rng).unwrap();
        for _ in 0..50 {
            sim.step(&mut rng);
        }
        let restored =
            SimulationState::from_snapshot(30, 30, Neighborhood::Moore, sim.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), sim.snapshot());
    }

    #[test]
    fn test_snapshot_rejects_off_lattice_walker() {
        let sim = SimulationState::new(10, 10, Neighborhood::Moore).unwrap();
        let mut snapshot = sim.snapshot();
        snapshot.walkers.push(Point::new(12, 3));
        let err =
            SimulationState::from_snapshot(10, 10, Neighborhood::Moore, snapshot).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_erase_removes_walkers_and_subtree() {
        let mut sim = lone_walker(5, 6, Neighborhood::Moore);
        sim.step_with(|| Direction::Right);
        sim.add_walkers([Point::new(6, 7), Point::new(0, 0)]);

        let report = sim.erase_within(Point::new(6, 6), 1);
        assert_eq!(report, EraseReport { entries: 1, walkers: 1 });
        assert_eq!(sim.cluster().len(), 1);
        assert_eq!(sim.walkers(), &[Point::new(0, 0)]);
    }

    #[test]
    fn test_reset_restores_seed() {
        let mut sim = lone_walker(5, 6, Neighborhood::Moore);
        sim.step_with(|| Direction::Right);
        sim.reset().unwrap();
        assert_eq!(sim.cluster().len(), 1);
        assert_eq!(sim.steps(), 0);
        assert!(sim.is_finished());
    }
}
