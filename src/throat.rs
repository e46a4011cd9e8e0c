use crate::constants::Axis;
use crate::grid::{Cell, Grid};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A corridor cell narrow enough to fence off.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Throat {
    pub cell: Cell,
    /// Direction of travel through the throat.
    pub corridor: Axis,
    /// Open width across the corridor, `1..=3`.
    pub span: usize,
}

/// Floor cells outside open areas that run along exactly one axis, in
/// row-major order.
pub fn throat_candidates(grid: &Grid) -> Vec<Throat> {
    let core = grid.room_core_mask();
    let mut candidates = vec![];
    for cell in grid.interior_cells() {
        if grid.is_wall(cell) || core[(cell.y, cell.x)] {
            continue;
        }
        let (x, y) = (cell.x as isize, cell.y as isize);
        let open = |dx: isize, dy: isize| !grid.is_wall_or_outside(x + dx, y + dy);
        let vertical = open(0, 1) && open(0, -1);
        let horizontal = open(1, 0) && open(-1, 0);

        let corridor = if vertical && !horizontal {
            Axis::Vertical
        } else if horizontal && !vertical {
            Axis::Horizontal
        } else {
            continue;
        };
        candidates.push(Throat {
            cell,
            corridor,
            span: grid.open_span(cell, corridor.perpendicular()),
        });
    }
    candidates
}

/// Shuffled throat candidates thinned so that no two accepted throats are
/// within `min_spacing` cells of each other. `max_count == 0` means no cap.
pub fn find_throats<R>(grid: &Grid, min_spacing: usize, max_count: usize, rng: &mut R) -> Vec<Throat>
where
    R: Rng + ?Sized,
{
    let mut candidates = throat_candidates(grid);
    if candidates.is_empty() {
        log::warn!("no throat candidates found");
        return vec![];
    }
    candidates.shuffle(rng);

    let limit = if max_count == 0 { usize::MAX } else { max_count };
    let spacing_sq = min_spacing * min_spacing;
    let mut picked: Vec<Throat> = vec![];
    for throat in candidates {
        if picked.len() >= limit {
            break;
        }
        let too_close = min_spacing > 0
            && picked.iter().any(|p| {
                let (dx, dy) = (p.cell.x.abs_diff(throat.cell.x), p.cell.y.abs_diff(throat.cell.y));
                dx * dx + dy * dy <= spacing_sq
            });
        if !too_close {
            picked.push(throat);
        }
    }
    log::debug!("picked {} throats", picked.len());
    picked
}
