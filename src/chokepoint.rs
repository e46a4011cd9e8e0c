use crate::constants::DIRECTIONS;
use crate::grid::{Cell, Grid};
use crate::room::RoomBounds;
use pathfinding::matrix::Matrix;
use pathfinding::prelude::bfs;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Floor on the number of options a layer cut keeps after shuffling.
pub const MIN_CUT_OPTIONS: usize = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChokepointKind {
    /// A bridge of the cell graph on the start-goal bridge-tree path.
    Bridge,
    /// Every edge between two BFS distance layers. `truncated` is set when
    /// the option cap dropped some of them, in which case blocking every
    /// option no longer guarantees a cut.
    LayerCut { truncated: bool },
    /// Middle edge of one shortest path. Not a guarantee of anything.
    Advisory,
}

/// A 4-adjacent floor pair. `from` lies on the start side, `to` on the goal side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChokeLink {
    pub from: Cell,
    pub to: Cell,
    /// Cell to wall off to block this link.
    pub gate: Cell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChokepointNode {
    pub kind: ChokepointKind,
    pub options: Vec<ChokeLink>,
}

impl ChokepointNode {
    pub fn is_single(&self) -> bool {
        self.options.len() == 1
    }

    /// Bridges and untruncated layer cuts are structural guarantees.
    pub fn is_verified(&self) -> bool {
        matches!(
            self.kind,
            ChokepointKind::Bridge | ChokepointKind::LayerCut { truncated: false }
        )
    }

    pub fn gates(&self) -> impl Iterator<Item = Cell> + '_ {
        self.options.iter().map(|link| link.gate)
    }

    /// Walls every gate on a copy of `grid` and checks that `goal` can no
    /// longer be reached from `start`.
    pub fn blocks_all_routes(&self, grid: &Grid, start: Cell, goal: Cell) -> bool {
        let mut blocked = grid.clone();
        for gate in self.gates() {
            blocked.set_wall(gate, true);
        }
        !blocked.is_reachable(start, goal)
    }
}

/// Looks for a place where one obstacle (or one of a few) must sit on every
/// start-to-goal route. Returns at most one node, and none when `goal` is not
/// reachable from `start` or when the reachable area is a bridgeless, fully
/// open rectangle.
pub fn find_chokepoints<R>(
    grid: &Grid,
    start: Cell,
    goal: Cell,
    max_cut_options: usize,
    rng: &mut R,
) -> Vec<ChokepointNode>
where
    R: Rng + ?Sized,
{
    if start == goal || !grid.is_reachable(start, goal) {
        log::debug!("no chokepoint: {goal} is not reachable from {start}");
        return vec![];
    }
    let reachable = grid.reachable_mask(start);

    if let Some(link) = find_bridge_link(grid, &reachable, start, goal) {
        log::debug!("bridge chokepoint at {}", link.gate);
        return vec![ChokepointNode {
            kind: ChokepointKind::Bridge,
            options: vec![link],
        }];
    }

    if is_open_rectangle(grid, &reachable) {
        log::debug!("no chokepoint: the area around {start} is fully open");
        return vec![];
    }

    if let Some(node) = find_layer_cut(grid, &reachable, start, goal, max_cut_options, rng) {
        log::debug!("layer cut with {} options", node.options.len());
        return vec![node];
    }

    log::warn!("no bridge or layer cut between {start} and {goal}, using an advisory link");
    advisory_link(grid, start, goal)
        .map(|link| ChokepointNode {
            kind: ChokepointKind::Advisory,
            options: vec![link],
        })
        .into_iter()
        .collect()
}

/// True when the reachable cells fill their bounding box with no wall inside.
fn is_open_rectangle(grid: &Grid, reachable: &Matrix<bool>) -> bool {
    let mut cells = grid.cells().filter(|c| reachable[(c.y, c.x)]);
    let Some(first) = cells.next() else {
        return false;
    };
    let mut bounds = RoomBounds::from_cell(first);
    let mut count = 1;
    for cell in cells {
        bounds.include(cell);
        count += 1;
    }
    count == bounds.area()
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

fn reachable_neighbors<'a>(
    grid: &'a Grid,
    reachable: &'a Matrix<bool>,
    cell: Cell,
) -> impl Iterator<Item = Cell> + 'a {
    DIRECTIONS
        .iter()
        .filter_map(move |dir| grid.neighbor(cell, *dir))
        .filter(move |n| reachable[(n.y, n.x)])
}

struct DfsFrame {
    cell: Cell,
    parent: Option<Cell>,
    next_dir: usize,
}

/// Bridges of the reachable cell graph, found with an explicit-stack Tarjan
/// low-link pass rooted at `start`. Edges are flat cell-index pairs, low first.
pub fn find_bridges(grid: &Grid, reachable: &Matrix<bool>, start: Cell) -> BTreeSet<(usize, usize)> {
    let width = grid.width();
    let mut disc: Vec<Option<usize>> = vec![None; grid.len()];
    let mut low: Vec<usize> = vec![0; grid.len()];
    let mut bridges = BTreeSet::new();
    if !reachable[(start.y, start.x)] {
        return bridges;
    }

    let mut time = 0;
    disc[start.index(width)] = Some(time);
    low[start.index(width)] = time;
    time += 1;
    let mut stack = vec![DfsFrame {
        cell: start,
        parent: None,
        next_dir: 0,
    }];

    while let Some(top) = stack.last_mut() {
        let (cell, parent) = (top.cell, top.parent);
        let u = cell.index(width);

        if top.next_dir < DIRECTIONS.len() {
            let dir = DIRECTIONS[top.next_dir];
            top.next_dir += 1;
            let Some(next) = grid.neighbor(cell, dir).filter(|n| reachable[(n.y, n.x)]) else {
                continue;
            };
            if Some(next) == parent {
                continue;
            }
            let v = next.index(width);
            match disc[v] {
                Some(seen) => low[u] = low[u].min(seen),
                None => {
                    disc[v] = Some(time);
                    low[v] = time;
                    time += 1;
                    stack.push(DfsFrame {
                        cell: next,
                        parent: Some(cell),
                        next_dir: 0,
                    });
                }
            }
            continue;
        }

        stack.pop();
        if let Some(parent) = parent {
            let p = parent.index(width);
            low[p] = low[p].min(low[u]);
            if disc[p].is_some_and(|parent_disc| low[u] > parent_disc) {
                bridges.insert(edge_key(p, u));
            }
        }
    }
    bridges
}

/// Component arena of the bridge tree: each reachable cell is labelled with
/// its 2-edge-connected component, and `bridges` keeps one representative
/// cell edge per adjacent component pair.
struct BridgeTree {
    component: Matrix<Option<usize>>,
    adjacency: Vec<BTreeSet<usize>>,
    bridges: BTreeMap<(usize, usize), (Cell, Cell)>,
}

impl BridgeTree {
    fn build(grid: &Grid, reachable: &Matrix<bool>, cut: &BTreeSet<(usize, usize)>) -> Self {
        let width = grid.width();
        let mut component: Matrix<Option<usize>> = Matrix::new(grid.height(), grid.width(), None);
        let mut count = 0;
        let mut queue = VecDeque::new();

        for seed in grid.cells().filter(|c| reachable[(c.y, c.x)]) {
            if component[(seed.y, seed.x)].is_some() {
                continue;
            }
            let id = count;
            count += 1;
            component[(seed.y, seed.x)] = Some(id);
            queue.push_back(seed);
            while let Some(cell) = queue.pop_front() {
                for next in reachable_neighbors(grid, reachable, cell) {
                    if component[(next.y, next.x)].is_some()
                        || cut.contains(&edge_key(cell.index(width), next.index(width)))
                    {
                        continue;
                    }
                    component[(next.y, next.x)] = Some(id);
                    queue.push_back(next);
                }
            }
        }

        let mut adjacency = vec![BTreeSet::new(); count];
        let mut bridges = BTreeMap::new();
        for &(a, b) in cut {
            let (cell_a, cell_b) = (Cell::from_index(a, width), Cell::from_index(b, width));
            let (Some(ca), Some(cb)) = (
                component[(cell_a.y, cell_a.x)],
                component[(cell_b.y, cell_b.x)],
            ) else {
                continue;
            };
            if ca == cb {
                continue;
            }
            adjacency[ca].insert(cb);
            adjacency[cb].insert(ca);
            bridges.entry(edge_key(ca, cb)).or_insert((cell_a, cell_b));
        }

        BridgeTree {
            component,
            adjacency,
            bridges,
        }
    }

    fn component_of(&self, cell: Cell) -> Option<usize> {
        self.component[(cell.y, cell.x)]
    }

    /// The bridge joining `from_comp` to `to_comp`, oriented from → to.
    fn bridge_between(&self, from_comp: usize, to_comp: usize) -> Option<(Cell, Cell)> {
        let &(a, b) = self.bridges.get(&edge_key(from_comp, to_comp))?;
        if self.component_of(a) == Some(from_comp) {
            Some((a, b))
        } else {
            Some((b, a))
        }
    }
}

fn find_bridge_link(
    grid: &Grid,
    reachable: &Matrix<bool>,
    start: Cell,
    goal: Cell,
) -> Option<ChokeLink> {
    let cut = find_bridges(grid, reachable, start);
    if cut.is_empty() {
        return None;
    }

    let tree = BridgeTree::build(grid, reachable, &cut);
    let (start_comp, goal_comp) = (tree.component_of(start)?, tree.component_of(goal)?);
    if start_comp == goal_comp {
        log::debug!("{} bridges, none separates start from goal", cut.len());
        return None;
    }

    let path = bfs(
        &start_comp,
        |comp| tree.adjacency[*comp].iter().copied().collect::<Vec<_>>(),
        |comp| *comp == goal_comp,
    )?;
    let mid = (path.len() - 2) / 2;
    let (from, to) = tree.bridge_between(path[mid], path[mid + 1])?;
    let gate = if to == goal { from } else { to };
    Some(ChokeLink { from, to, gate })
}

/// BFS distance from `start` over the reachable cells.
pub fn distance_layers(grid: &Grid, reachable: &Matrix<bool>, start: Cell) -> Matrix<Option<usize>> {
    let mut dist: Matrix<Option<usize>> = Matrix::new(grid.height(), grid.width(), None);
    if !reachable[(start.y, start.x)] {
        return dist;
    }
    dist[(start.y, start.x)] = Some(0);
    let mut queue = VecDeque::from([start]);
    while let Some(cell) = queue.pop_front() {
        let Some(d) = dist[(cell.y, cell.x)] else {
            continue;
        };
        for next in reachable_neighbors(grid, reachable, cell) {
            if dist[(next.y, next.x)].is_none() {
                dist[(next.y, next.x)] = Some(d + 1);
                queue.push_back(next);
            }
        }
    }
    dist
}

/// Edges from a cell at distance `d` to a cell at distance `d + 1`, scanned
/// row-major.
fn layer_boundary(grid: &Grid, dist: &Matrix<Option<usize>>, d: usize) -> Vec<(Cell, Cell)> {
    let mut edges = vec![];
    for cell in grid.cells().filter(|c| dist[(c.y, c.x)] == Some(d)) {
        for dir in DIRECTIONS {
            if let Some(next) = grid.neighbor(cell, dir) {
                if dist[(next.y, next.x)] == Some(d + 1) {
                    edges.push((cell, next));
                }
            }
        }
    }
    edges
}

fn find_layer_cut<R>(
    grid: &Grid,
    reachable: &Matrix<bool>,
    start: Cell,
    goal: Cell,
    max_cut_options: usize,
    rng: &mut R,
) -> Option<ChokepointNode>
where
    R: Rng + ?Sized,
{
    let dist = distance_layers(grid, reachable, start);
    let goal_dist = dist[(goal.y, goal.x)]?;
    if goal_dist <= 1 {
        return None;
    }

    // Alternate outward from the middle layer: mid, mid - 1, mid + 1, ...
    let mid = (goal_dist / 2).clamp(1, goal_dist - 1);
    let mut edges = (0..goal_dist)
        .filter_map(|step| {
            let offset = step / 2;
            if step % 2 == 0 {
                Some(mid + offset)
            } else {
                mid.checked_sub(offset + 1)
            }
        })
        .filter(|d| (1..goal_dist).contains(d))
        .map(|d| layer_boundary(grid, &dist, d))
        .find(|edges| edges.len() >= MIN_CUT_OPTIONS)?;

    edges.shuffle(rng);
    let total = edges.len();
    let take = max_cut_options.max(MIN_CUT_OPTIONS).min(total);

    let mut seen = BTreeSet::new();
    let options: Vec<ChokeLink> = edges
        .into_iter()
        .filter(|&(from, to)| seen.insert((from.min(to), from.max(to))))
        .take(take)
        .map(|(from, to)| ChokeLink { from, to, gate: to })
        .collect();
    if options.len() < MIN_CUT_OPTIONS {
        return None;
    }

    Some(ChokepointNode {
        kind: ChokepointKind::LayerCut {
            truncated: options.len() < total,
        },
        options,
    })
}

fn advisory_link(grid: &Grid, start: Cell, goal: Cell) -> Option<ChokeLink> {
    let path = grid.shortest_path(start, goal)?;
    if path.len() < 2 {
        return None;
    }
    let mid = (path.len() - 2) / 2;
    Some(ChokeLink {
        from: path[mid],
        to: path[mid + 1],
        gate: path[mid + 1],
    })
}
