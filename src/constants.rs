use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction4 {
    Right,
    Left,
    Down,
    Up,
}

// Neighbour visiting order for every 4-connected search in the crate.
pub const DIRECTIONS: [Direction4; 4] = [
    Direction4::Right,
    Direction4::Left,
    Direction4::Down,
    Direction4::Up,
];

impl Direction4 {
    pub fn offset(&self) -> (isize, isize) {
        match self {
            Direction4::Right => (1, 0),
            Direction4::Left => (-1, 0),
            Direction4::Down => (0, 1),
            Direction4::Up => (0, -1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction4::Right => Direction4::Left,
            Direction4::Left => Direction4::Right,
            Direction4::Down => Direction4::Up,
            Direction4::Up => Direction4::Down,
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Direction4::Right | Direction4::Left => Axis::Horizontal,
            Direction4::Down | Direction4::Up => Axis::Vertical,
        }
    }
}

/// Axis along which two cells face each other across a wall or a link.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    /// Left/right neighbours.
    Horizontal,
    /// Up/down neighbours.
    Vertical,
}

pub const AXES: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

impl Axis {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Axis::Horizontal,
            1 => Axis::Vertical,
            _ => panic!("axis index {index} is outside 0..2"),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Axis::Horizontal => 0,
            Axis::Vertical => 1,
        }
    }

    /// The two directions pointing along this axis, negative side first.
    pub fn directions(&self) -> (Direction4, Direction4) {
        match self {
            Axis::Horizontal => (Direction4::Left, Direction4::Right),
            Axis::Vertical => (Direction4::Up, Direction4::Down),
        }
    }

    pub fn perpendicular(&self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}
