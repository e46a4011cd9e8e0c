use crate::constants::Axis;
use crate::grid::{Cell, Grid};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const MAX_ROAD_WIDTH: usize = 3;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadWidthConfig {
    /// Clamped to `1..=3` when sampling.
    pub max_width: usize,
    pub width2_chance: f64,
    pub width3_chance: f64,
}

impl Default for RoadWidthConfig {
    fn default() -> Self {
        RoadWidthConfig {
            max_width: 3,
            width2_chance: 0.22,
            width3_chance: 0.10,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadWidening {
    pub segments: usize,
    pub cells_opened: usize,
}

/// Width of one corridor segment. Width 3 is tried first, then width 2, each
/// with its own uniform draw.
pub fn sample_segment_width<R>(config: &RoadWidthConfig, rng: &mut R) -> usize
where
    R: Rng + ?Sized,
{
    let max_width = config.max_width.clamp(1, MAX_ROAD_WIDTH);
    if max_width <= 1 {
        return 1;
    }
    if max_width >= 3 && rng.gen::<f64>() < config.width3_chance {
        return 3;
    }
    if rng.gen::<f64>() < config.width2_chance {
        return 2;
    }
    1
}

/// Widens the corridor stretches of the shortest start-to-goal route.
///
/// Path cells inside open areas (see [`Grid::room_core_mask`]) are left
/// alone. Each maximal run of the remaining cells is one segment, and every
/// cell of a segment gets the same band width across its step direction.
pub fn widen_main_route<R>(
    grid: &mut Grid,
    start: Cell,
    goal: Cell,
    config: &RoadWidthConfig,
    rng: &mut R,
) -> RoadWidening
where
    R: Rng + ?Sized,
{
    let mut widening = RoadWidening::default();
    let Some(path) = grid.shortest_path(start, goal) else {
        log::debug!("road widening skipped: no route from {start} to {goal}");
        return widening;
    };
    if path.len() < 2 {
        return widening;
    }

    let core = grid.room_core_mask();
    let is_core = |cell: Cell| core[(cell.y, cell.x)];

    let mut i = 1;
    while i < path.len() {
        if is_core(path[i]) {
            i += 1;
            continue;
        }
        let segment_end = (i..path.len())
            .find(|&k| is_core(path[k]))
            .unwrap_or(path.len());
        let width = sample_segment_width(config, rng);
        for k in i..segment_end {
            let band_axis = if path[k].x != path[k - 1].x {
                Axis::Vertical
            } else {
                Axis::Horizontal
            };
            widening.cells_opened += carve_band(grid, path[k], band_axis, width);
        }
        widening.segments += 1;
        i = segment_end;
    }

    log::debug!(
        "road widening: {} segments, {} cells opened",
        widening.segments,
        widening.cells_opened
    );
    widening
}

/// Opens the cells beside `center` along `axis`. Width 2 prefers the positive
/// side and falls back to the negative one at the border.
fn carve_band(grid: &mut Grid, center: Cell, axis: Axis, width: usize) -> usize {
    let (neg, pos) = axis.directions();
    let neg_cell = grid.neighbor(center, neg).filter(|c| grid.is_interior(*c));
    let pos_cell = grid.neighbor(center, pos).filter(|c| grid.is_interior(*c));

    let sides = match width {
        0 | 1 => vec![],
        2 => pos_cell.or(neg_cell).into_iter().collect(),
        _ => neg_cell.into_iter().chain(pos_cell).collect(),
    };
    sides
        .into_iter()
        .filter(|cell| grid.carve_interior(*cell))
        .count()
}
