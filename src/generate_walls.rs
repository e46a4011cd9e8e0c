use crate::grid::{Cell, Grid};
use rand::Rng;

/// Cellular-automata passes applied after the noise fill.
pub const SMOOTHING_PASSES: usize = 2;

/// Noise fill, two smoothing passes, then the border ring forced to wall.
///
/// Interior cells are drawn row-major, one `f64` each. The border stays floor
/// while smoothing and is only walled at the end.
pub fn generate_walls<R>(width: usize, height: usize, initial_wall_fill: f64, rng: &mut R) -> Grid
where
    R: Rng + ?Sized,
{
    let mut grid = Grid::all_floor(width, height);
    for cell in grid.interior_cells() {
        grid.set_wall(cell, rng.gen::<f64>() < initial_wall_fill);
    }

    for _ in 0..SMOOTHING_PASSES {
        smooth_once(&mut grid);
    }

    grid.force_border();
    grid
}

/// One smoothing step over interior cells. Neighbour counts come from the
/// snapshot taken before the pass: 5 or more walls forces wall, 2 or fewer
/// forces floor, anything else is kept.
pub fn smooth_once(grid: &mut Grid) {
    let snapshot = grid.clone();
    for cell in snapshot.interior_cells() {
        let walls = count_wall_neighbors8(&snapshot, cell);
        if walls >= 5 {
            grid.set_wall(cell, true);
        } else if walls <= 2 {
            grid.set_wall(cell, false);
        }
    }
}

fn count_wall_neighbors8(grid: &Grid, cell: Cell) -> usize {
    let (x, y) = (cell.x as isize, cell.y as isize);
    let mut count = 0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if (dx, dy) != (0, 0) && grid.is_wall_or_outside(x + dx, y + dy) {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_fill_is_open() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = generate_walls(10, 10, 0.0, &mut rng);
        assert_eq!(grid, Grid::border_only(10, 10));
    }

    #[test]
    fn test_full_fill_is_solid() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = generate_walls(12, 9, 1.0, &mut rng);
        assert_eq!(grid.floor_count(), 0);
    }

    #[test]
    fn test_border_and_determinism() {
        for seed in 0..8 {
            let a = generate_walls(40, 30, 0.38, &mut StdRng::seed_from_u64(seed));
            let b = generate_walls(40, 30, 0.38, &mut StdRng::seed_from_u64(seed));
            assert!(a.has_wall_border());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_smoothing_reads_the_snapshot() {
        // A lone wall has no wall neighbours and disappears; a lone floor cell
        // in a solid block is surrounded by 8 walls and fills in.
        let mut grid = Grid::from_ascii(&[
            "#######", //
            "#.....#", //
            "#..#..#", //
            "#.....#", //
            "#######", //
        ]);
        smooth_once(&mut grid);
        assert!(grid.is_floor(Cell::new(3, 2)));

        let mut grid = Grid::from_ascii(&[
            "#####", //
            "#####", //
            "##.##", //
            "#####", //
            "#####", //
        ]);
        smooth_once(&mut grid);
        assert_eq!(grid.floor_count(), 0);
    }
}
