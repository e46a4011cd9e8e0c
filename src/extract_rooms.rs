use crate::grid::{Cell, Grid};
use crate::room::{Room, RoomId};
use pathfinding::matrix::Matrix;
use std::collections::VecDeque;

/// Room labelling of one grid snapshot.
#[derive(Debug, Clone)]
pub struct RoomMap {
    labels: Matrix<Option<RoomId>>,
    pub rooms: Vec<Room>,
}

impl RoomMap {
    pub fn width(&self) -> usize {
        self.labels.columns
    }

    pub fn height(&self) -> usize {
        self.labels.rows
    }

    /// `None` for walls and the border ring.
    pub fn room_at(&self, cell: Cell) -> Option<RoomId> {
        self.labels[(cell.y, cell.x)]
    }

    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id.inner()]
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Panics when `grid` is not the snapshot these labels were built from.
    pub fn assert_matches(&self, grid: &Grid) {
        assert_eq!(
            (self.width(), self.height()),
            (grid.width(), grid.height()),
            "room labels and grid have different dimensions"
        );
    }
}

/// Labels every interior floor cell with the room it belongs to.
///
/// Scans interior cells row-major; the first unlabelled floor cell seeds a new
/// room that is flood-filled through 4-neighbours. Border cells never join a
/// room.
pub fn extract_rooms(grid: &Grid) -> RoomMap {
    let mut labels = Matrix::new(grid.height(), grid.width(), None);
    let mut rooms = Vec::new();
    let mut next_id = RoomId::first();
    let mut queue = VecDeque::new();

    for seed in grid.interior_cells() {
        if grid.is_wall(seed) || labels[(seed.y, seed.x)].is_some() {
            continue;
        }

        let id = next_id.gen_id();
        let mut room = Room::new(id, seed);
        labels[(seed.y, seed.x)] = Some(id);
        queue.push_back(seed);

        while let Some(cell) = queue.pop_front() {
            room.add_cell(cell);
            for next in grid.floor_neighbors(cell) {
                if !grid.is_interior(next) || labels[(next.y, next.x)].is_some() {
                    continue;
                }
                labels[(next.y, next.x)] = Some(id);
                queue.push_back(next);
            }
        }

        rooms.push(room);
    }

    log::debug!(
        "extracted {} rooms from {}x{} grid",
        rooms.len(),
        grid.width(),
        grid.height()
    );
    RoomMap { labels, rooms }
}
