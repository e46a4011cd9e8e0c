use crate::extract_rooms::{extract_rooms, RoomMap};
use crate::grid::{Cell, Grid};
use crate::room_connection::{build_room_graph, RoomPair, WallCandidate};
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorPickMode {
    /// Uniform pick per room pair.
    RandomPerPair,
    /// Contact whose midpoint is closest to the centroid of the group's midpoints.
    MidpointOfContacts,
    /// Contact with the most walls around its two floor cells.
    #[default]
    ThroatHeuristic,
}

/// A wall cell between two rooms. `cell_a` belongs to `rooms.low`,
/// `cell_b` to `rooms.high`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DoorLink {
    pub rooms: RoomPair,
    pub wall: Cell,
    pub cell_a: Cell,
    pub cell_b: Cell,
}

impl DoorLink {
    fn from_candidate(pair: RoomPair, candidate: &WallCandidate, room_map: &RoomMap) -> Self {
        let (cell_a, cell_b) = if room_map.room_at(candidate.side_a) == Some(pair.low) {
            (candidate.side_a, candidate.side_b)
        } else {
            (candidate.side_b, candidate.side_a)
        };
        DoorLink {
            rooms: pair,
            wall: candidate.wall,
            cell_a,
            cell_b,
        }
    }

    pub fn midpoint(&self) -> Vector2<f64> {
        (to_vector(self.cell_a) + to_vector(self.cell_b)) * 0.5
    }
}

fn to_vector(cell: Cell) -> Vector2<f64> {
    Vector2::new(cell.x as f64, cell.y as f64)
}

#[derive(Debug, Clone)]
pub struct DoorLocation {
    pub room_map: RoomMap,
    /// Every contact, grouped by ascending room pair.
    pub contacts: Vec<DoorLink>,
    pub selected: Vec<DoorLink>,
}

/// Finds doorway candidates between the rooms of a finished grid. With
/// `pick_one_per_pair` one contact per room pair is selected using `mode`,
/// otherwise every contact is selected. `seed` only feeds `RandomPerPair`.
pub fn find_doors(grid: &Grid, pick_one_per_pair: bool, mode: DoorPickMode, seed: u64) -> DoorLocation {
    let room_map = extract_rooms(grid);
    let graph = build_room_graph(grid, &room_map);

    let mut groups: BTreeMap<RoomPair, Vec<DoorLink>> = BTreeMap::new();
    for (pair, candidates) in graph.candidates.iter() {
        groups.insert(
            *pair,
            candidates
                .iter()
                .map(|candidate| DoorLink::from_candidate(*pair, candidate, &room_map))
                .collect(),
        );
    }
    let contacts: Vec<DoorLink> = groups.values().flatten().copied().collect();

    let selected = if pick_one_per_pair {
        let mut rng = StdRng::seed_from_u64(seed);
        groups
            .values()
            .filter_map(|group| pick_door(grid, group, mode, &mut rng))
            .collect()
    } else {
        contacts.clone()
    };

    log::debug!(
        "door locator: {} rooms, {} contacts, {} selected",
        room_map.len(),
        contacts.len(),
        selected.len()
    );
    DoorLocation {
        room_map,
        contacts,
        selected,
    }
}

pub fn pick_door<R>(grid: &Grid, group: &[DoorLink], mode: DoorPickMode, rng: &mut R) -> Option<DoorLink>
where
    R: Rng + ?Sized,
{
    if group.is_empty() {
        return None;
    }
    let picked = match mode {
        DoorPickMode::RandomPerPair => group[rng.gen_range(0..group.len())],
        DoorPickMode::MidpointOfContacts => pick_by_centroid(group),
        DoorPickMode::ThroatHeuristic => pick_by_throat(grid, group),
    };
    Some(picked)
}

// First minimum wins.
fn pick_by_centroid(group: &[DoorLink]) -> DoorLink {
    let centroid =
        group.iter().map(DoorLink::midpoint).sum::<Vector2<f64>>() / group.len() as f64;
    let mut best = group[0];
    let mut best_distance = f64::MAX;
    for link in group {
        let distance = (link.midpoint() - centroid).norm_squared();
        if distance < best_distance {
            best_distance = distance;
            best = *link;
        }
    }
    best
}

// First maximum wins.
fn pick_by_throat(grid: &Grid, group: &[DoorLink]) -> DoorLink {
    let mut best = group[0];
    let mut best_score = None;
    for link in group {
        let score = enclosure(grid, link.cell_a) + enclosure(grid, link.cell_b);
        if best_score.map_or(true, |b| score > b) {
            best_score = Some(score);
            best = *link;
        }
    }
    best
}

/// Wall or out-of-grid cells among the 4-neighbours.
fn enclosure(grid: &Grid, cell: Cell) -> usize {
    let (x, y) = (cell.x as isize, cell.y as isize);
    [(1, 0), (-1, 0), (0, 1), (0, -1)]
        .iter()
        .filter(|&&(dx, dy)| grid.is_wall_or_outside(x + dx, y + dy))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funnel() -> Grid {
        // Rooms 0 (left) and 1 (right) touch through the x=4 wall on rows 1-3.
        // Row 1 on the right is a dead-end nook, so its contact is the tightest.
        Grid::from_ascii(&[
            "#########", //
            "#...#.###", //
            "#...#...#", //
            "#...#...#", //
            "#########", //
        ])
    }

    #[test]
    fn test_contacts_are_grouped_and_oriented() {
        let location = find_doors(&funnel(), false, DoorPickMode::ThroatHeuristic, 0);
        assert_eq!(location.room_map.len(), 2);
        assert_eq!(location.contacts.len(), 3);
        assert_eq!(location.selected, location.contacts);
        for link in &location.contacts {
            assert_eq!(location.room_map.room_at(link.cell_a), Some(link.rooms.low));
            assert_eq!(location.room_map.room_at(link.cell_b), Some(link.rooms.high));
            assert_eq!(link.wall.x, 4);
        }
    }

    #[test]
    fn test_throat_prefers_the_tightest_contact() {
        let location = find_doors(&funnel(), true, DoorPickMode::ThroatHeuristic, 0);
        assert_eq!(location.selected.len(), 1);
        assert_eq!(location.selected[0].wall, Cell::new(4, 1));
    }

    #[test]
    fn test_midpoint_picks_the_middle_contact() {
        let location = find_doors(&funnel(), true, DoorPickMode::MidpointOfContacts, 0);
        assert_eq!(location.selected[0].wall, Cell::new(4, 2));
    }

    #[test]
    fn test_random_pick_is_seeded() {
        let grid = funnel();
        let a = find_doors(&grid, true, DoorPickMode::RandomPerPair, 77);
        let b = find_doors(&grid, true, DoorPickMode::RandomPerPair, 77);
        assert_eq!(a.selected, b.selected);
        assert!(a.contacts.contains(&a.selected[0]));
    }

    #[test]
    fn test_one_door_per_adjacent_pair() {
        let grid = Grid::from_ascii(&[
            "#########", //
            "#.#.#.#.#", //
            "#.#.#.#.#", //
            "#########", //
        ]);
        let location = find_doors(&grid, true, DoorPickMode::ThroatHeuristic, 0);
        assert_eq!(location.room_map.len(), 4);
        assert_eq!(location.contacts.len(), 6);
        assert_eq!(location.selected.len(), 3);
        let pairs = location.selected.iter().map(|l| l.rooms).collect::<Vec<_>>();
        let mut sorted = pairs.clone();
        sorted.sort();
        assert_eq!(pairs, sorted);
    }

    #[test]
    fn test_no_rooms_no_doors() {
        let location = find_doors(&Grid::border_only(6, 6), true, DoorPickMode::RandomPerPair, 1);
        assert!(location.contacts.is_empty());
        assert!(location.selected.is_empty());
    }
}
