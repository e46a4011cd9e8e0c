use crate::grid::{Cell, Grid};
use pathfinding::matrix::Matrix;
use std::collections::VecDeque;

/// Cells of a start-to-goal path through interior cells that crosses the
/// fewest walls, found with a 0-1 BFS: stepping onto floor costs nothing and
/// is pushed to the front of the deque, stepping onto wall costs one and goes
/// to the back. Both ends are included.
pub fn min_wall_crossing_path(grid: &Grid, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
    if !grid.is_interior(start) || !grid.is_interior(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut cost: Matrix<Option<usize>> = Matrix::new(grid.height(), grid.width(), None);
    let mut prev: Matrix<Option<Cell>> = Matrix::new(grid.height(), grid.width(), None);
    let mut deque = VecDeque::new();
    cost[(start.y, start.x)] = Some(0);
    deque.push_front(start);

    while let Some(cell) = deque.pop_front() {
        if cell == goal {
            break;
        }
        let Some(current) = cost[(cell.y, cell.x)] else {
            continue;
        };
        for next in grid.neighbors4(cell).filter(|n| grid.is_interior(*n)) {
            let step = grid.is_wall(next) as usize;
            let candidate = current + step;
            if cost[(next.y, next.x)].is_some_and(|known| known <= candidate) {
                continue;
            }
            cost[(next.y, next.x)] = Some(candidate);
            prev[(next.y, next.x)] = Some(cell);
            if step == 0 {
                deque.push_front(next);
            } else {
                deque.push_back(next);
            }
        }
    }

    cost[(goal.y, goal.x)]?;
    let mut path = vec![goal];
    let mut cell = goal;
    while cell != start {
        cell = prev[(cell.y, cell.x)]?;
        path.push(cell);
    }
    path.reverse();
    Some(path)
}

/// Carves the minimum-wall-crossing path open. Returns the number of wall
/// cells removed, or `None` when no interior route exists at all.
pub fn carve_min_wall_tunnel(grid: &mut Grid, start: Cell, goal: Cell) -> Option<usize> {
    let path = min_wall_crossing_path(grid, start, goal)?;
    let carved = path.iter().filter(|cell| grid.carve(**cell)).count();
    log::debug!(
        "tunnel {} -> {}: {} cells long, {} walls carved",
        start,
        goal,
        path.len(),
        carved
    );
    Some(carved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_through_single_wall() {
        let mut grid = Grid::from_ascii(&["#######", "#..#..#", "#######"]);
        let carved = carve_min_wall_tunnel(&mut grid, Cell::new(1, 1), Cell::new(5, 1));
        assert_eq!(carved, Some(1));
        insta::assert_snapshot!(grid.to_string(), @r"
        #######
        #.....#
        #######
        ");
    }

    #[test]
    fn test_prefers_detour_over_walls() {
        // Going straight costs two walls, the detour through row 3 costs none.
        let grid = Grid::from_ascii(&[
            "#######", //
            "#.##..#", //
            "#.##.##", //
            "#.....#", //
            "#######", //
        ]);
        let path = min_wall_crossing_path(&grid, Cell::new(1, 1), Cell::new(5, 1)).unwrap();
        assert!(path.iter().all(|cell| grid.is_floor(*cell)));
        assert!(path.windows(2).all(|w| w[0].is_adjacent(&w[1])));
    }

    #[test]
    fn test_counts_walls_crossed() {
        let grid = Grid::from_ascii(&[
            "########", //
            "#.##.#.#", //
            "########", //
        ]);
        let path = min_wall_crossing_path(&grid, Cell::new(1, 1), Cell::new(6, 1)).unwrap();
        let crossed = path.iter().filter(|cell| grid.is_wall(**cell)).count();
        assert_eq!(crossed, 3);
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_border_cells_are_not_endpoints() {
        let grid = Grid::border_only(5, 5);
        assert!(min_wall_crossing_path(&grid, Cell::new(0, 2), Cell::new(2, 2)).is_none());
    }
}
