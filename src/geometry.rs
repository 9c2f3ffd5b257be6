use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A lattice cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Center cell of a lattice, rounding down
    pub fn center_of(width: usize, height: usize) -> Self {
        Self::new((width / 2) as i32, (height / 2) as i32)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn moved(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    pub fn in_bounds(self, width: usize, height: usize) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as usize) < width && (self.y as usize) < height
    }

    /// Pin to `[0, width-1] x [0, height-1]`
    pub fn clamped(self, width: usize, height: usize) -> Self {
        let max_x = width.saturating_sub(1) as i32;
        let max_y = height.saturating_sub(1) as i32;
        Self::new(self.x.clamp(0, max_x), self.y.clamp(0, max_y))
    }

    pub fn distance_squared(self, other: Point) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Packed `y * width + x` key. Only meaningful for in-bounds points.
    pub fn key(self, width: usize) -> PointKey {
        PointKey(self.y as u64 * width as u64 + self.x as u64)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Packed integer identity of a lattice cell within one lattice width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointKey(pub u64);

impl PointKey {
    pub fn to_point(self, width: usize) -> Point {
        let width = width.max(1) as u64;
        Point::new((self.0 % width) as i32, (self.0 / width) as i32)
    }
}

/// Axis-aligned unit move. Walkers always move 4-directionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Down,
        Direction::Up,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
            Direction::Down => (0, 1),
            Direction::Up => (0, -1),
        }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Neighbor set used for stick detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Neighborhood {
    /// 4 neighbors (orthogonal only) - angular, cross-like growth
    VonNeumann,
    /// 8 neighbors (orthogonal + diagonal) - denser, more natural branching
    #[default]
    Moore,
}

impl Neighborhood {
    pub fn name(&self) -> &str {
        match self {
            Neighborhood::VonNeumann => "VonNeumann",
            Neighborhood::Moore => "Moore",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Neighborhood::VonNeumann => Neighborhood::Moore,
            Neighborhood::Moore => Neighborhood::VonNeumann,
        }
    }

    pub fn prev(&self) -> Self {
        // two variants, so cycling back is the same as cycling forward
        self.next()
    }

    /// Neighbor offsets in fixed enumeration order.
    /// The orthogonal four always come first so parent choice is stable
    /// across both neighborhoods.
    pub fn offsets(&self) -> &'static [(i32, i32)] {
        match self {
            Neighborhood::VonNeumann => &[(1, 0), (-1, 0), (0, 1), (0, -1)],
            Neighborhood::Moore => &[
                (1, 0),
                (-1, 0),
                (0, 1),
                (0, -1),
                (1, 1),
                (-1, -1),
                (-1, 1),
                (1, -1),
            ],
        }
    }

    pub fn neighbors(&self, point: Point) -> impl Iterator<Item = Point> {
        self.offsets()
            .iter()
            .map(move |&(dx, dy)| point.offset(dx, dy))
    }
}
