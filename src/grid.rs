use crate::constants::{Axis, Direction4, DIRECTIONS};
use pathfinding::matrix::Matrix;
use pathfinding::prelude::{bfs, bfs_reach};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Cell { x, y }
    }

    pub fn manhattan(&self, other: &Cell) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn is_adjacent(&self, other: &Cell) -> bool {
        self.manhattan(other) == 1
    }

    /// Flat row-major index used by the per-cell arrays of the graph passes.
    pub fn index(&self, width: usize) -> usize {
        self.y * width + self.x
    }

    pub fn from_index(index: usize, width: usize) -> Self {
        Cell::new(index % width, index / width)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Wall matrix of a generated map. `true` is wall.
///
/// Rows are `y`, columns are `x`. Every map produced by the generator keeps
/// the outer ring of cells as wall; hand-built grids (`from_ascii`) are taken
/// as given.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    walls: Matrix<bool>,
}

impl Grid {
    /// All cells floor, border included. Only the generator starts from this
    /// state; it forces the border before handing the grid out.
    pub(crate) fn all_floor(width: usize, height: usize) -> Self {
        Grid {
            walls: Matrix::new(height, width, false),
        }
    }

    /// Walls on the border ring only. This is the `FallbackBorderOnly` map.
    pub fn border_only(width: usize, height: usize) -> Self {
        let mut grid = Grid::all_floor(width, height);
        grid.force_border();
        grid
    }

    /// Builds a grid from rows of `#` (wall) and `.` (floor).
    ///
    /// Panics on ragged rows or unknown characters.
    pub fn from_ascii(rows: &[&str]) -> Self {
        assert!(!rows.is_empty(), "grid needs at least one row");
        let width = rows[0].chars().count();
        let mut grid = Grid::all_floor(width, rows.len());
        for (y, row) in rows.iter().enumerate() {
            assert_eq!(row.chars().count(), width, "row {y} has a different width");
            for (x, c) in row.chars().enumerate() {
                let wall = match c {
                    '#' => true,
                    '.' => false,
                    other => panic!("unknown grid character {other:?} at ({x}, {y})"),
                };
                grid.set_wall(Cell::new(x, y), wall);
            }
        }
        grid
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.walls.columns
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.walls.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_wall(&self, cell: Cell) -> bool {
        self.walls[(cell.y, cell.x)]
    }

    #[inline]
    pub fn is_floor(&self, cell: Cell) -> bool {
        !self.is_wall(cell)
    }

    #[inline]
    pub fn set_wall(&mut self, cell: Cell, wall: bool) {
        self.walls[(cell.y, cell.x)] = wall;
    }

    /// Turns a wall cell into floor. Returns whether anything changed.
    pub fn carve(&mut self, cell: Cell) -> bool {
        if self.is_wall(cell) {
            self.set_wall(cell, false);
            true
        } else {
            false
        }
    }

    /// Like `carve`, but never touches the border ring.
    pub fn carve_interior(&mut self, cell: Cell) -> bool {
        self.is_interior(cell) && self.carve(cell)
    }

    pub fn is_interior(&self, cell: Cell) -> bool {
        cell.x > 0 && cell.y > 0 && cell.x + 1 < self.width() && cell.y + 1 < self.height()
    }

    pub fn cell_at(&self, x: isize, y: isize) -> Option<Cell> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        (x < self.width() && y < self.height()).then_some(Cell::new(x, y))
    }

    /// Out-of-range coordinates read as wall.
    pub fn is_wall_or_outside(&self, x: isize, y: isize) -> bool {
        self.cell_at(x, y).map_or(true, |cell| self.is_wall(cell))
    }

    pub fn neighbor(&self, cell: Cell, dir: Direction4) -> Option<Cell> {
        let (dx, dy) = dir.offset();
        self.cell_at(cell.x as isize + dx, cell.y as isize + dy)
    }

    pub fn neighbors4(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        DIRECTIONS
            .iter()
            .filter_map(move |dir| self.neighbor(cell, *dir))
    }

    pub fn floor_neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        self.neighbors4(cell).filter(|n| self.is_floor(*n))
    }

    /// Number of 4-neighbours that are floor.
    pub fn open4(&self, cell: Cell) -> usize {
        self.floor_neighbors(cell).count()
    }

    pub fn force_border(&mut self) {
        let (width, height) = (self.width(), self.height());
        for x in 0..width {
            self.set_wall(Cell::new(x, 0), true);
            self.set_wall(Cell::new(x, height - 1), true);
        }
        for y in 0..height {
            self.set_wall(Cell::new(0, y), true);
            self.set_wall(Cell::new(width - 1, y), true);
        }
    }

    pub fn has_wall_border(&self) -> bool {
        self.cells()
            .filter(|cell| !self.is_interior(*cell))
            .all(|cell| self.is_wall(cell))
    }

    /// All cells, row-major.
    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let width = self.width();
        (0..self.len()).map(move |i| Cell::from_index(i, width))
    }

    /// Interior cells, row-major.
    pub fn interior_cells(&self) -> impl Iterator<Item = Cell> {
        let (width, height) = (self.width(), self.height());
        (1..height.saturating_sub(1))
            .flat_map(move |y| (1..width.saturating_sub(1)).map(move |x| Cell::new(x, y)))
    }

    pub fn floor_count(&self) -> usize {
        self.cells().filter(|cell| self.is_floor(*cell)).count()
    }

    pub fn is_reachable(&self, start: Cell, goal: Cell) -> bool {
        if self.is_wall(start) || self.is_wall(goal) {
            return false;
        }
        bfs_reach(start, |cell| self.floor_neighbors(*cell).collect::<Vec<_>>())
            .any(|cell| cell == goal)
    }

    /// Floor cells reachable from `start`, start included. Empty if `start` is a wall.
    pub fn reachable_mask(&self, start: Cell) -> Matrix<bool> {
        let mut mask = Matrix::new(self.height(), self.width(), false);
        if self.is_wall(start) {
            return mask;
        }
        for cell in bfs_reach(start, |cell| self.floor_neighbors(*cell).collect::<Vec<_>>()) {
            mask[(cell.y, cell.x)] = true;
        }
        mask
    }

    /// A shortest 4-connected floor path, both ends included.
    pub fn shortest_path(&self, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
        if self.is_wall(start) || self.is_wall(goal) {
            return None;
        }
        bfs(
            &start,
            |cell| self.floor_neighbors(*cell).collect::<Vec<_>>(),
            |cell| *cell == goal,
        )
    }

    /// Floor cells that look like part of an open area rather than a corridor:
    /// at least three open 4-neighbours, or a corner of a fully open 2x2 block.
    pub fn room_core_mask(&self) -> Matrix<bool> {
        let mut core = Matrix::new(self.height(), self.width(), false);
        for cell in self.interior_cells() {
            if self.is_wall(cell) {
                continue;
            }
            let (x, y) = (cell.x as isize, cell.y as isize);
            let open = |dx: isize, dy: isize| !self.is_wall_or_outside(x + dx, y + dy);
            let in_open_block = [(1, 1), (-1, 1), (1, -1), (-1, -1)]
                .iter()
                .any(|&(sx, sy)| open(sx, 0) && open(0, sy) && open(sx, sy));
            core[(cell.y, cell.x)] = self.open4(cell) >= 3 || in_open_block;
        }
        core
    }

    /// Open width across `axis` at `cell`, capped at 3: the cell itself plus
    /// whichever interior floor neighbours sit on either side along `axis`.
    pub fn open_span(&self, cell: Cell, axis: Axis) -> usize {
        let (neg, pos) = axis.directions();
        let walkable = |dir: Direction4| {
            self.neighbor(cell, dir)
                .is_some_and(|n| self.is_interior(n) && self.is_floor(n))
        };
        1 + walkable(neg) as usize + walkable(pos) as usize
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {}x{}", self.width(), self.height())?;
        write!(f, "{self}")
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height() {
            if y > 0 {
                writeln!(f)?;
            }
            for x in 0..self.width() {
                let c = if self.is_wall(Cell::new(x, y)) { '#' } else { '.' };
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}
