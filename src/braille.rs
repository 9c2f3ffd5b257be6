use dla_lattice::{Point, SimulationState};
use ratatui::style::Color;
use std::collections::HashSet;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// Distance gradient: (position 0-1, rgb)
const GRADIENT: [(f32, (u8, u8, u8)); 3] = [
    (0.0, (0x2A, 0x7B, 0x9B)),
    (0.31, (0x57, 0xC7, 0x85)),
    (1.0, (0xED, 0xDD, 0x53)),
];

const WALKER_COLOR: Color = Color::Rgb(0xFF, 0x00, 0x80);
const CURSOR_COLOR: Color = Color::Yellow;

/// A single rendered Braille cell with position and color
#[derive(Clone, Copy)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub color: Color,
}

/// Render cluster, walkers and the tool cursor to Braille characters.
///
/// Cluster dots are colored by their mean distance from the root. A cell
/// holding any walker dot is drawn in the walker color, and the cell under
/// the cursor in the cursor color.
pub fn render_to_braille(
    simulation: &SimulationState,
    walkers: &[Point],
    cursor: Option<Point>,
    canvas_width: u16,
    canvas_height: u16,
) -> Vec<BrailleCell> {
    let sim_width = simulation.width();
    let sim_height = simulation.height();
    let cluster = simulation.cluster();

    // Braille effective resolution
    let braille_width = canvas_width as usize * 2;
    let braille_height = canvas_height as usize * 4;
    if braille_width == 0 || braille_height == 0 {
        return Vec::new();
    }

    // Scale factors (pre-calculated once)
    let scale_x = sim_width as f32 / braille_width as f32;
    let scale_y = sim_height as f32 / braille_height as f32;

    let max_distance = cluster.distance_stats().max.unwrap_or(0).max(1) as f32;
    let walker_cells: HashSet<Point> = walkers.iter().copied().collect();
    let cursor_cell = cursor.map(|p| {
        (
            (p.x as f32 / scale_x / 2.0) as u16,
            (p.y as f32 / scale_y / 4.0) as u16,
        )
    });

    let mut cells = Vec::with_capacity((canvas_width as usize) * (canvas_height as usize));

    for cy in 0..canvas_height {
        for cx in 0..canvas_width {
            let mut pattern: u8 = 0;
            let mut total_value: f32 = 0.0;
            let mut cluster_dots: usize = 0;
            let mut has_walker = false;

            // Sample the 2x4 dots for this Braille character
            let base_bx = cx as usize * 2;
            let base_by = cy as usize * 4;

            for dx in 0..2 {
                for dy in 0..4 {
                    let sim_x = ((base_bx + dx) as f32 * scale_x) as i32;
                    let sim_y = ((base_by + dy) as f32 * scale_y) as i32;
                    let point = Point::new(sim_x, sim_y);

                    if let Some(entry) = cluster.get(point) {
                        pattern |= BRAILLE_DOTS[dx][dy];
                        cluster_dots += 1;
                        total_value += entry.distance as f32 / max_distance;
                    } else if walker_cells.contains(&point) {
                        pattern |= BRAILLE_DOTS[dx][dy];
                        has_walker = true;
                    }
                }
            }

            let is_cursor = cursor_cell == Some((cx, cy));
            if is_cursor && pattern == 0 {
                pattern = 0xFF;
            }

            // Only emit cells that have at least one dot
            if pattern != 0 {
                let braille_char = char::from_u32(BRAILLE_BASE + pattern as u32).unwrap_or(' ');

                let color = if is_cursor {
                    CURSOR_COLOR
                } else if has_walker {
                    WALKER_COLOR
                } else {
                    gradient_color(total_value / cluster_dots.max(1) as f32)
                };

                cells.push(BrailleCell {
                    x: cx,
                    y: cy,
                    char: braille_char,
                    color,
                });
            }
        }
    }

    cells
}

/// Linear interpolation along the distance gradient, `t` in 0-1
fn gradient_color(t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    for pair in GRADIENT.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if t <= p1 {
            let f = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
            let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * f).round() as u8;
            return Color::Rgb(lerp(c0.0, c1.0), lerp(c0.1, c1.1), lerp(c0.2, c1.2));
        }
    }
    let (_, (r, g, b)) = GRADIENT[GRADIENT.len() - 1];
    Color::Rgb(r, g, b)
}

/// Calculate optimal simulation grid size for a given canvas size
/// Returns (width, height) for the simulation grid
pub fn calculate_simulation_size(canvas_width: u16, canvas_height: u16) -> (usize, usize) {
    // Braille gives 2x4 resolution per character
    // We want the simulation grid to match this resolution
    let width = (canvas_width as usize * 2).max(64);
    let height = (canvas_height as usize * 4).max(64);
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dla_lattice::Neighborhood;

    #[test]
    fn test_braille_pattern() {
        // Test that single dot patterns work correctly
        assert_eq!(BRAILLE_DOTS[0][0], 0x01); // Top-left
        assert_eq!(BRAILLE_DOTS[1][0], 0x08); // Top-right
        assert_eq!(BRAILLE_DOTS[0][3], 0x40); // Bottom-left
        assert_eq!(BRAILLE_DOTS[1][3], 0x80); // Bottom-right

        // All dots should give 0xFF
        let all_dots: u8 = BRAILLE_DOTS[0].iter().sum::<u8>() + BRAILLE_DOTS[1].iter().sum::<u8>();
        assert_eq!(all_dots, 0xFF);
    }

    #[test]
    fn test_gradient_endpoints() {
        assert_eq!(gradient_color(0.0), Color::Rgb(0x2A, 0x7B, 0x9B));
        assert_eq!(gradient_color(0.31), Color::Rgb(0x57, 0xC7, 0x85));
        assert_eq!(gradient_color(1.0), Color::Rgb(0xED, 0xDD, 0x53));
        assert_eq!(gradient_color(7.0), Color::Rgb(0xED, 0xDD, 0x53));
    }

    #[test]
    fn test_seed_and_walker_are_drawn() {
        // One sim cell per braille dot
        let sim = SimulationState::new(8, 8, Neighborhood::Moore).unwrap();
        let walkers = [Point::new(0, 0)];
        let cells = render_to_braille(&sim, &walkers, None, 4, 2);

        assert_eq!(cells.len(), 2);
        let walker = cells.iter().find(|c| c.x == 0 && c.y == 0).unwrap();
        assert_eq!(walker.color, WALKER_COLOR);
        assert_eq!(walker.char, '\u{2801}');
        // Seed at (4, 4): braille cell (2, 1), top-left dot
        let seed = cells.iter().find(|c| c.x == 2 && c.y == 1).unwrap();
        assert_eq!(seed.char, '\u{2801}');
        assert_eq!(seed.color, gradient_color(0.0));
    }

    #[test]
    fn test_cursor_fills_empty_cell() {
        let sim = SimulationState::new(8, 8, Neighborhood::Moore).unwrap();
        let cells = render_to_braille(&sim, &[], Some(Point::new(1, 6)), 4, 2);
        let cursor = cells.iter().find(|c| c.x == 0 && c.y == 1).unwrap();
        assert_eq!(cursor.char, '\u{28FF}');
        assert_eq!(cursor.color, CURSOR_COLOR);
    }

    #[test]
    fn test_simulation_size_has_minimum() {
        assert_eq!(calculate_simulation_size(10, 5), (64, 64));
        assert_eq!(calculate_simulation_size(100, 40), (200, 160));
    }
}
