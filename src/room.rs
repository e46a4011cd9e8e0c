use crate::grid::Cell;
use serde::{Deserialize, Serialize};

/// Dense room index. Ids are handed out in flood-fill order starting at 0, so
/// they double as indices into the room arena.
#[derive(Ord, PartialOrd, PartialEq, Eq, Hash, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct RoomId(usize);

impl RoomId {
    pub fn first() -> Self {
        RoomId(0)
    }

    pub fn gen_id(&mut self) -> Self {
        let ret = *self;
        self.0 += 1;
        ret
    }

    pub fn inner(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomBounds {
    pub min_x: usize,
    pub max_x: usize,
    pub min_y: usize,
    pub max_y: usize,
}

impl RoomBounds {
    pub fn from_cell(cell: Cell) -> Self {
        RoomBounds {
            min_x: cell.x,
            max_x: cell.x,
            min_y: cell.y,
            max_y: cell.y,
        }
    }

    pub fn include(&mut self, cell: Cell) {
        self.min_x = self.min_x.min(cell.x);
        self.max_x = self.max_x.max(cell.x);
        self.min_y = self.min_y.min(cell.y);
        self.max_y = self.max_y.max(cell.y);
    }

    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }
}

/// Maximal 4-connected floor component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub cell_count: usize,
    pub bounds: RoomBounds,
}

impl Room {
    pub fn new(id: RoomId, seed_cell: Cell) -> Self {
        Room {
            id,
            cell_count: 0,
            bounds: RoomBounds::from_cell(seed_cell),
        }
    }

    pub fn add_cell(&mut self, cell: Cell) {
        self.cell_count += 1;
        self.bounds.include(cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_id_is_dense() {
        let mut next = RoomId::first();
        let ids = (0..3).map(|_| next.gen_id().inner()).collect::<Vec<_>>();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_bounds_grow_with_cells() {
        let mut room = Room::new(RoomId::first(), Cell::new(3, 2));
        for cell in [Cell::new(3, 2), Cell::new(5, 2), Cell::new(4, 6)] {
            room.add_cell(cell);
        }
        assert_eq!(room.cell_count, 3);
        assert_eq!((room.bounds.width(), room.bounds.height()), (3, 5));
        assert_eq!(room.bounds.area(), 15);
    }
}
