use crate::constants::{Axis, AXES};
use crate::extract_rooms::RoomMap;
use crate::grid::{Cell, Grid};
use crate::room::RoomId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Unordered room pair, stored as `(low, high)`.
#[derive(Ord, PartialOrd, PartialEq, Eq, Hash, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct RoomPair {
    pub low: RoomId,
    pub high: RoomId,
}

impl RoomPair {
    pub fn new(room0_id: RoomId, room1_id: RoomId) -> Self {
        if room0_id <= room1_id {
            RoomPair {
                low: room0_id,
                high: room1_id,
            }
        } else {
            RoomPair {
                low: room1_id,
                high: room0_id,
            }
        }
    }

    pub fn contains(&self, id: RoomId) -> bool {
        self.low == id || self.high == id
    }
}

/// A wall cell whose two opposite neighbours along `axis` are floor cells of
/// different rooms. Carving `wall` joins those rooms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallCandidate {
    pub wall: Cell,
    pub side_a: Cell,
    pub side_b: Cell,
    pub axis: Axis,
}

impl WallCandidate {
    /// Openness of the junction: floor 4-neighbours around both sides.
    pub fn openness(&self, grid: &Grid) -> usize {
        grid.open4(self.side_a) + grid.open4(self.side_b)
    }
}

/// Removable-wall candidates grouped per room pair, plus per-room adjacency.
#[derive(Debug, Clone, Default)]
pub struct RoomGraph {
    pub candidates: BTreeMap<RoomPair, Vec<WallCandidate>>,
    neighbors: Vec<BTreeSet<RoomId>>,
}

impl RoomGraph {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn neighbors(&self, room: RoomId) -> impl Iterator<Item = RoomId> + '_ {
        self.neighbors
            .get(room.inner())
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn candidates_for(&self, pair: RoomPair) -> &[WallCandidate] {
        self.candidates.get(&pair).map_or(&[], Vec::as_slice)
    }

    /// Unweighted BFS over rooms. The returned path includes both ends.
    pub fn room_path(&self, start: RoomId, goal: RoomId) -> Option<Vec<RoomId>> {
        pathfinding::prelude::bfs(
            &start,
            |room| self.neighbors(*room).collect::<Vec<_>>(),
            |room| *room == goal,
        )
    }
}

/// Collects every interior wall cell that separates two different rooms,
/// testing the horizontal pair first and the vertical pair second.
pub fn build_room_graph(grid: &Grid, room_map: &RoomMap) -> RoomGraph {
    room_map.assert_matches(grid);

    let mut candidates: BTreeMap<RoomPair, Vec<WallCandidate>> = BTreeMap::new();
    for wall in grid.interior_cells().filter(|cell| grid.is_wall(*cell)) {
        for axis in AXES {
            let (neg, pos) = axis.directions();
            let (Some(side_a), Some(side_b)) = (grid.neighbor(wall, neg), grid.neighbor(wall, pos))
            else {
                continue;
            };
            if grid.is_wall(side_a) || grid.is_wall(side_b) {
                continue;
            }
            let (Some(room_a), Some(room_b)) = (room_map.room_at(side_a), room_map.room_at(side_b))
            else {
                continue;
            };
            if room_a == room_b {
                continue;
            }
            candidates
                .entry(RoomPair::new(room_a, room_b))
                .or_default()
                .push(WallCandidate {
                    wall,
                    side_a,
                    side_b,
                    axis,
                });
        }
    }

    let mut neighbors = vec![BTreeSet::new(); room_map.len()];
    for pair in candidates.keys() {
        neighbors[pair.low.inner()].insert(pair.high);
        neighbors[pair.high.inner()].insert(pair.low);
    }

    log::debug!(
        "room graph: {} room pairs, {} wall candidates",
        candidates.len(),
        candidates.values().map(Vec::len).sum::<usize>()
    );
    RoomGraph {
        candidates,
        neighbors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract_rooms::extract_rooms;

    fn graph_of(rows: &[&str]) -> (Grid, RoomMap, RoomGraph) {
        let grid = Grid::from_ascii(rows);
        let room_map = extract_rooms(&grid);
        let graph = build_room_graph(&grid, &room_map);
        (grid, room_map, graph)
    }

    #[test]
    fn test_room_pair_is_unordered() {
        let mut next = RoomId::first();
        let (a, b) = (next.gen_id(), next.gen_id());
        assert_eq!(RoomPair::new(a, b), RoomPair::new(b, a));
        assert_eq!(RoomPair::new(b, a).low, a);
        assert!(RoomPair::new(a, b).contains(b));
    }

    #[test]
    fn test_single_wall_column_yields_one_candidate_per_row() {
        let (_, room_map, graph) = graph_of(&[
            "#######", //
            "#..#..#", //
            "#..#..#", //
            "#..#..#", //
            "#######", //
        ]);
        assert_eq!(room_map.len(), 2);
        assert_eq!(graph.edge_count(), 1);
        let pair = *graph.candidates.keys().next().unwrap();
        let list = graph.candidates_for(pair);
        assert_eq!(list.len(), 3);
        assert!(list.iter().all(|c| c.axis == Axis::Horizontal && c.wall.x == 3));
        assert_eq!(graph.neighbors(pair.low).collect::<Vec<_>>(), vec![pair.high]);
    }

    #[test]
    fn test_junction_wall_yields_both_axes() {
        // The centre wall touches four single-cell rooms.
        let (_, room_map, graph) = graph_of(&[
            "#####", //
            "##.##", //
            "#.#.#", //
            "##.##", //
            "#####", //
        ]);
        assert_eq!(room_map.len(), 4);
        let centre = Cell::new(2, 2);
        let at_centre = graph
            .candidates
            .values()
            .flatten()
            .filter(|c| c.wall == centre)
            .map(|c| c.axis)
            .collect::<Vec<_>>();
        assert_eq!(at_centre, vec![Axis::Vertical, Axis::Horizontal]);
    }

    #[test]
    fn test_thick_walls_give_no_candidates() {
        let (_, room_map, graph) = graph_of(&[
            "########", //
            "#..##..#", //
            "#..##..#", //
            "########", //
        ]);
        assert_eq!(room_map.len(), 2);
        assert!(graph.is_empty());
        assert_eq!(graph.room_path(RoomId::first(), room_map.rooms[1].id), None);
    }

    #[test]
    fn test_room_path_walks_the_chain() {
        let (_, room_map, graph) = graph_of(&[
            "#########", //
            "#.#.#.#.#", //
            "#########", //
        ]);
        assert_eq!(room_map.len(), 4);
        let ids = room_map.rooms.iter().map(|r| r.id).collect::<Vec<_>>();
        let path = graph.room_path(ids[0], ids[3]).unwrap();
        assert_eq!(path, ids);
    }
}
