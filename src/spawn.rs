use crate::error::{DlaError, Result};
use crate::geometry::Point;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_EDGE_MARGIN: usize = 1;

/// Square spawn area, optionally moved off-center and rotated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquareRegion {
    /// Side length in cells
    pub size: usize,
    /// Offset of the square center from the lattice center
    pub x_offset: i32,
    pub y_offset: i32,
    /// Rotation about the square center, in degrees
    pub rotation_degrees: f64,
}

impl Default for SquareRegion {
    fn default() -> Self {
        Self {
            size: 100,
            x_offset: 0,
            y_offset: 0,
            rotation_degrees: 0.0,
        }
    }
}

/// How a fresh simulation populates its walkers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpawnConfig {
    /// Seed only; walkers get added later
    Empty,
    Border { count: usize, margin: usize },
    Square { count: usize, region: SquareRegion },
}

impl SpawnConfig {
    pub fn generate<R: Rng>(
        &self,
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<Vec<Point>> {
        match self {
            SpawnConfig::Empty => Ok(Vec::new()),
            SpawnConfig::Border { count, margin } => {
                spawn_border_with_margin(width, height, *count, *margin, rng)
            }
            SpawnConfig::Square { count, region } => {
                spawn_square(width, height, *count, region, rng)
            }
        }
    }
}

fn check_lattice(width: usize, height: usize) -> Result<()> {
    DlaError::check_dimensions(width, height)
}

fn check_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(DlaError::InvalidConfiguration(
            "walker count must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Random coordinate along an edge of `len` cells, keeping `margin` cells
/// clear at both ends when the edge is long enough
fn along_edge<R: Rng>(len: usize, margin: usize, rng: &mut R) -> i32 {
    if len > margin.saturating_mul(2) {
        rng.gen_range(margin..len - margin) as i32
    } else {
        rng.gen_range(0..len) as i32
    }
}

/// Walkers on the lattice border with the default edge margin
pub fn spawn_border<R: Rng>(
    width: usize,
    height: usize,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Point>> {
    spawn_border_with_margin(width, height, count, DEFAULT_EDGE_MARGIN, rng)
}

/// Walkers on a uniformly chosen edge, at a uniform position along it
pub fn spawn_border_with_margin<R: Rng>(
    width: usize,
    height: usize,
    count: usize,
    margin: usize,
    rng: &mut R,
) -> Result<Vec<Point>> {
    check_lattice(width, height)?;
    check_count(count)?;

    let right = width as i32 - 1;
    let bottom = height as i32 - 1;
    let walkers: Vec<Point> = (0..count)
        .map(|_| match rng.gen_range(0..4) {
            0 => Point::new(along_edge(width, margin, rng), 0), // Top
            1 => Point::new(along_edge(width, margin, rng), bottom), // Bottom
            2 => Point::new(0, along_edge(height, margin, rng)), // Left
            _ => Point::new(right, along_edge(height, margin, rng)), // Right
        })
        .collect();

    debug!(count, margin, width, height, "spawned border walkers");
    Ok(walkers)
}

/// Walkers inside a (possibly offset and rotated) square
pub fn spawn_square<R: Rng>(
    width: usize,
    height: usize,
    count: usize,
    region: &SquareRegion,
    rng: &mut R,
) -> Result<Vec<Point>> {
    check_lattice(width, height)?;
    check_count(count)?;
    if region.size == 0 {
        return Err(DlaError::InvalidConfiguration(
            "spawn square size must be positive".to_string(),
        ));
    }

    let center = Point::center_of(width, height).offset(region.x_offset, region.y_offset);
    let half = (region.size / 2) as i64;
    let (sin, cos) = region.rotation_degrees.to_radians().sin_cos();

    let walkers: Vec<Point> = (0..count)
        .map(|_| {
            let dx = (rng.gen_range(0..region.size) as i64 - half) as f64;
            let dy = (rng.gen_range(0..region.size) as i64 - half) as f64;
            let rx = dx * cos - dy * sin;
            let ry = dx * sin + dy * cos;
            Point::new(
                (center.x as f64 + rx).floor() as i32,
                (center.y as f64 + ry).floor() as i32,
            )
            .clamped(width, height)
        })
        .collect();

    debug!(
        count,
        size = region.size,
        x_offset = region.x_offset,
        y_offset = region.y_offset,
        rotation = region.rotation_degrees,
        "spawned square walkers"
    );
    Ok(walkers)
}

/// Walkers scattered uniformly over a disc, like a paint brush dab
pub fn spawn_brush<R: Rng>(
    width: usize,
    height: usize,
    count: usize,
    center: Point,
    radius: u32,
    rng: &mut R,
) -> Result<Vec<Point>> {
    check_lattice(width, height)?;
    check_count(count)?;
    if radius == 0 {
        return Err(DlaError::InvalidConfiguration(
            "brush radius must be positive".to_string(),
        ));
    }

    let r = radius as i32;
    let radius_sq = r as i64 * r as i64;
    let mut walkers = Vec::with_capacity(count);
    while walkers.len() < count {
        let dx = rng.gen_range(-r..=r);
        let dy = rng.gen_range(-r..=r);
        if (dx as i64 * dx as i64 + dy as i64 * dy as i64) <= radius_sq {
            walkers.push(center.offset(dx, dy).clamped(width, height));
        }
    }

    debug!(count, radius, %center, "spawned brush walkers");
    Ok(walkers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_border_points_lie_on_edges() {
        let mut rng = StdRng::seed_from_u64(1);
        let walkers = spawn_border(100, 100, 500, &mut rng).unwrap();
        assert_eq!(walkers.len(), 500);
        for p in walkers {
            assert!(p.x == 0 || p.x == 99 || p.y == 0 || p.y == 99, "{} off edge", p);
            assert!(p.in_bounds(100, 100));
        }
    }

    #[test]
    fn test_border_margin_keeps_corners_clear() {
        let mut rng = StdRng::seed_from_u64(2);
        let walkers = spawn_border_with_margin(50, 30, 400, 3, &mut rng).unwrap();
        for p in walkers {
            if p.y == 0 || p.y == 29 {
                assert!((3..47).contains(&p.x));
            } else {
                assert!((3..27).contains(&p.y));
            }
        }
    }

    #[test]
    fn test_border_margin_too_wide_falls_back_to_full_edge() {
        let mut rng = StdRng::seed_from_u64(3);
        let walkers = spawn_border_with_margin(2, 2, 50, 5, &mut rng).unwrap();
        assert!(walkers.iter().all(|p| p.in_bounds(2, 2)));
    }

    #[test]
    fn test_huge_margin_falls_back_to_full_edge() {
        let mut rng = StdRng::seed_from_u64(11);
        let walkers = spawn_border_with_margin(20, 20, 50, usize::MAX, &mut rng).unwrap();
        assert_eq!(walkers.len(), 50);
        assert!(walkers.iter().all(|p| p.in_bounds(20, 20)));
    }

    #[test]
    fn test_square_unrotated_bounds() {
        let mut rng = StdRng::seed_from_u64(4);
        let region = SquareRegion {
            size: 20,
            ..SquareRegion::default()
        };
        let walkers = spawn_square(200, 200, 1000, &region, &mut rng).unwrap();
        for p in walkers {
            assert!((90..110).contains(&p.x), "{}", p);
            assert!((90..110).contains(&p.y), "{}", p);
        }
    }

    #[test]
    fn test_square_offset_moves_region() {
        let mut rng = StdRng::seed_from_u64(5);
        let region = SquareRegion {
            size: 10,
            x_offset: 40,
            y_offset: -30,
            rotation_degrees: 0.0,
        };
        let walkers = spawn_square(200, 200, 300, &region, &mut rng).unwrap();
        for p in walkers {
            assert!((135..145).contains(&p.x));
            assert!((65..75).contains(&p.y));
        }
    }

    #[test]
    fn test_square_rotation_stays_within_circumcircle() {
        let mut rng = StdRng::seed_from_u64(6);
        let region = SquareRegion {
            size: 40,
            rotation_degrees: 45.0,
            ..SquareRegion::default()
        };
        let center = Point::center_of(200, 200);
        let walkers = spawn_square(200, 200, 1000, &region, &mut rng).unwrap();
        // half-diagonal of a 40 square is ~28.3, plus one cell for flooring
        for p in walkers {
            assert!(p.distance_squared(center) <= 30 * 30);
        }
    }

    #[test]
    fn test_square_clamps_to_lattice() {
        let mut rng = StdRng::seed_from_u64(7);
        let region = SquareRegion {
            size: 50,
            x_offset: 100,
            ..SquareRegion::default()
        };
        let walkers = spawn_square(40, 40, 200, &region, &mut rng).unwrap();
        assert!(walkers.iter().all(|p| p.in_bounds(40, 40)));
    }

    #[test]
    fn test_brush_points_within_radius() {
        let mut rng = StdRng::seed_from_u64(8);
        let center = Point::new(30, 30);
        let walkers = spawn_brush(100, 100, 250, center, 5, &mut rng).unwrap();
        assert_eq!(walkers.len(), 250);
        assert!(walkers.iter().all(|p| p.distance_squared(center) <= 25));
    }

    #[test]
    fn test_invalid_configuration() {
        let mut rng = StdRng::seed_from_u64(9);
        let zero_square = SquareRegion {
            size: 0,
            ..SquareRegion::default()
        };
        assert!(spawn_border(100, 100, 0, &mut rng)
            .unwrap_err()
            .is_invalid_configuration());
        assert!(spawn_border(0, 100, 10, &mut rng)
            .unwrap_err()
            .is_invalid_configuration());
        assert!(spawn_border(i32::MAX as usize + 1, 1, 10, &mut rng)
            .unwrap_err()
            .is_invalid_configuration());
        assert!(spawn_square(100, 100, 10, &zero_square, &mut rng)
            .unwrap_err()
            .is_invalid_configuration());
        assert!(spawn_brush(100, 100, 10, Point::new(1, 1), 0, &mut rng)
            .unwrap_err()
            .is_invalid_configuration());
    }

    #[test]
    fn test_spawn_config_empty() {
        let mut rng = StdRng::seed_from_u64(10);
        assert!(SpawnConfig::Empty.generate(10, 10, &mut rng).unwrap().is_empty());
    }
}
