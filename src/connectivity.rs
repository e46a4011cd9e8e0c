use crate::btree_key_values::BTreeKeyValues;
use crate::extract_rooms::extract_rooms;
use crate::generate_map::MapGeneratorConfig;
use crate::grid::{Cell, Grid};
use crate::room::RoomId;
use crate::room_connection::{build_room_graph, RoomGraph, RoomPair, WallCandidate};
use crate::tunnel::carve_min_wall_tunnel;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// Loop-door edges on the main branch need at least this many candidates.
pub const LOOP_EDGE_MIN_CANDIDATES: usize = 2;
/// After a tunnel without a usable room path, only wide contacts get doors.
pub const NO_PATH_LOOP_EDGE_MIN_CANDIDATES: usize = 3;
pub const NO_PATH_LOOP_DOORS: usize = 8;
/// Door count the post-tunnel loop budget is scaled from, at minimum.
pub const REBUILT_LOOP_BASE_DOORS: usize = 4;
pub const REBUILT_MIN_LOOP_DOORS: usize = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnPair {
    pub start: Cell,
    pub goal: Cell,
}

/// States the planner passes through, recorded in order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlannerStage {
    RoomsExtracted,
    PathPlanned,
    DoorsCarved,
    LoopsAdded,
    NoRoomPath,
    TunnelCarved,
    LoopsRebuilt,
    Validated,
    FallbackBorderOnly,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FallbackReason {
    SpawnPickFailed,
    TunnelCarveFailed,
    ValidationFailed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationOutcome {
    /// Start and goal rooms joined by doors along a room-graph path.
    RoomPath {
        doors_carved: usize,
        loop_doors: usize,
    },
    /// No room path existed; a minimum-wall tunnel was carved instead.
    Tunnel {
        walls_carved: usize,
        loop_doors: usize,
    },
    /// The grid was reset to walls on the border only.
    FallbackBorderOnly(FallbackReason),
}

impl GenerationOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, GenerationOutcome::FallbackBorderOnly(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerReport {
    pub outcome: GenerationOutcome,
    /// `None` only when spawn picking failed.
    pub spawns: Option<SpawnPair>,
    pub trace: Vec<PlannerStage>,
}

enum State {
    PickSpawns,
    ExtractRooms(SpawnPair),
    CarveDoors {
        spawns: SpawnPair,
        graph: RoomGraph,
        path: Vec<RoomId>,
    },
    AddLoops {
        spawns: SpawnPair,
        graph: RoomGraph,
        path: Vec<RoomId>,
        doors_carved: usize,
    },
    CarveTunnel(SpawnPair),
    RebuildLoops {
        spawns: SpawnPair,
        walls_carved: usize,
    },
    Validate {
        spawns: SpawnPair,
        outcome: GenerationOutcome,
    },
    Fallback {
        spawns: Option<SpawnPair>,
        reason: FallbackReason,
    },
}

/// Picks spawns on `grid` and makes sure the goal is reachable from the start,
/// carving doors (or a tunnel) as needed. On any failure the grid is reset to
/// border walls only and the outcome says why.
pub fn connect_spawns<R>(grid: &mut Grid, config: &MapGeneratorConfig, rng: &mut R) -> PlannerReport
where
    R: Rng + ?Sized,
{
    let mut trace = Vec::new();
    let mut state = State::PickSpawns;

    loop {
        state = match state {
            State::PickSpawns => match pick_spawns(grid, config, rng) {
                Some(spawns) => State::ExtractRooms(spawns),
                None => {
                    log::warn!("failed to pick spawns, falling back to border-only map");
                    State::Fallback {
                        spawns: None,
                        reason: FallbackReason::SpawnPickFailed,
                    }
                }
            },
            State::ExtractRooms(spawns) => {
                let room_map = extract_rooms(grid);
                trace.push(PlannerStage::RoomsExtracted);
                let graph = build_room_graph(grid, &room_map);
                let path = match (room_map.room_at(spawns.start), room_map.room_at(spawns.goal)) {
                    (Some(start_room), Some(goal_room)) => graph.room_path(start_room, goal_room),
                    _ => None,
                };
                match path {
                    Some(path) => {
                        trace.push(PlannerStage::PathPlanned);
                        State::CarveDoors {
                            spawns,
                            graph,
                            path,
                        }
                    }
                    None => {
                        log::warn!(
                            "no room path between {} and {}, carving a tunnel",
                            spawns.start,
                            spawns.goal
                        );
                        trace.push(PlannerStage::NoRoomPath);
                        State::CarveTunnel(spawns)
                    }
                }
            }
            State::CarveDoors {
                spawns,
                graph,
                path,
            } => {
                let doors_carved = carve_doors_along_path(grid, &graph, &path, rng);
                trace.push(PlannerStage::DoorsCarved);
                State::AddLoops {
                    spawns,
                    graph,
                    path,
                    doors_carved,
                }
            }
            State::AddLoops {
                spawns,
                graph,
                path,
                doors_carved,
            } => {
                let budget = scaled_loop_budget(doors_carved, config.loop_door_ratio);
                let loop_doors = add_loop_doors(
                    grid,
                    &graph,
                    &path_edges(&path),
                    LOOP_EDGE_MIN_CANDIDATES,
                    budget,
                    rng,
                );
                trace.push(PlannerStage::LoopsAdded);
                State::Validate {
                    spawns,
                    outcome: GenerationOutcome::RoomPath {
                        doors_carved,
                        loop_doors,
                    },
                }
            }
            State::CarveTunnel(spawns) => {
                match carve_min_wall_tunnel(grid, spawns.start, spawns.goal) {
                    Some(walls_carved) => {
                        trace.push(PlannerStage::TunnelCarved);
                        State::RebuildLoops {
                            spawns,
                            walls_carved,
                        }
                    }
                    None => {
                        log::warn!("tunnel carve failed, falling back to border-only map");
                        State::Fallback {
                            spawns: Some(spawns),
                            reason: FallbackReason::TunnelCarveFailed,
                        }
                    }
                }
            }
            State::RebuildLoops {
                spawns,
                walls_carved,
            } => {
                let loop_doors = add_loops_after_tunnel(grid, spawns, config, rng);
                trace.push(PlannerStage::LoopsRebuilt);
                State::Validate {
                    spawns,
                    outcome: GenerationOutcome::Tunnel {
                        walls_carved,
                        loop_doors,
                    },
                }
            }
            State::Validate { spawns, outcome } => {
                if grid.is_reachable(spawns.start, spawns.goal) {
                    trace.push(PlannerStage::Validated);
                    log::debug!("connectivity validated: {outcome:?}");
                    return PlannerReport {
                        outcome,
                        spawns: Some(spawns),
                        trace,
                    };
                }
                log::warn!("connectivity validation failed, falling back to border-only map");
                State::Fallback {
                    spawns: Some(spawns),
                    reason: FallbackReason::ValidationFailed,
                }
            }
            State::Fallback { spawns, reason } => {
                *grid = Grid::border_only(grid.width(), grid.height());
                trace.push(PlannerStage::FallbackBorderOnly);
                return PlannerReport {
                    outcome: GenerationOutcome::FallbackBorderOnly(reason),
                    spawns,
                    trace,
                };
            }
        };
    }
}

/// Two floor cells at least `min_spawn_manhattan_distance` apart, each found
/// by bounded rejection sampling over interior cells.
pub fn pick_spawns<R>(grid: &Grid, config: &MapGeneratorConfig, rng: &mut R) -> Option<SpawnPair>
where
    R: Rng + ?Sized,
{
    if grid.width() < 3 || grid.height() < 3 {
        return None;
    }
    let widest = (grid.width() - 3) + (grid.height() - 3);
    if config.min_spawn_manhattan_distance > widest {
        log::debug!(
            "min spawn distance {} exceeds the widest interior span {}",
            config.min_spawn_manhattan_distance,
            widest
        );
        return None;
    }

    let tries = config.spawn_pick_tries;
    let start = (0..tries)
        .map(|_| random_inner_cell(grid, rng))
        .find(|cell| grid.is_floor(*cell))?;
    let goal = (0..tries).map(|_| random_inner_cell(grid, rng)).find(|cell| {
        grid.is_floor(*cell) && cell.manhattan(&start) >= config.min_spawn_manhattan_distance
    })?;
    Some(SpawnPair { start, goal })
}

fn random_inner_cell<R>(grid: &Grid, rng: &mut R) -> Cell
where
    R: Rng + ?Sized,
{
    let x = rng.gen_range(1..grid.width() - 1);
    let y = rng.gen_range(1..grid.height() - 1);
    Cell::new(x, y)
}

/// The candidate with the most open junction. Ties are settled by a coin flip
/// per tying candidate, so the stream advances once per tie.
pub fn pick_most_open<'a, R>(
    grid: &Grid,
    candidates: &'a [WallCandidate],
    rng: &mut R,
) -> Option<&'a WallCandidate>
where
    R: Rng + ?Sized,
{
    let mut best: Option<(usize, &WallCandidate)> = None;
    for candidate in candidates {
        let score = candidate.openness(grid);
        let replace = match best {
            None => true,
            Some((best_score, _)) => {
                score > best_score || (score == best_score && rng.gen_range(0..2) == 0)
            }
        };
        if replace {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Carves one door per consecutive room pair of `path`. Returns doors carved.
pub fn carve_doors_along_path<R>(
    grid: &mut Grid,
    graph: &RoomGraph,
    path: &[RoomId],
    rng: &mut R,
) -> usize
where
    R: Rng + ?Sized,
{
    let mut carved = 0;
    for step in path.windows(2) {
        let candidates = graph.candidates_for(RoomPair::new(step[0], step[1]));
        let Some(chosen) = pick_most_open(grid, candidates, rng) else {
            continue;
        };
        if grid.carve(chosen.wall) {
            carved += 1;
        }
    }
    log::debug!("carved {carved} doors along a {}-room path", path.len());
    carved
}

fn path_edges(path: &[RoomId]) -> BTreeSet<RoomPair> {
    path.windows(2)
        .map(|step| RoomPair::new(step[0], step[1]))
        .collect()
}

fn scaled_loop_budget(doors: usize, ratio: f64) -> usize {
    (doors as f64 * ratio).round().max(0.0) as usize
}

/// Opens up to `budget` extra doors on room pairs outside `excluded` that have
/// at least `min_candidates` candidates, widest contacts first. A pick that
/// lands on an already open cell is skipped without counting.
pub fn add_loop_doors<R>(
    grid: &mut Grid,
    graph: &RoomGraph,
    excluded: &BTreeSet<RoomPair>,
    min_candidates: usize,
    budget: usize,
    rng: &mut R,
) -> usize
where
    R: Rng + ?Sized,
{
    if budget == 0 {
        return 0;
    }

    let mut by_width = BTreeKeyValues::default();
    for (pair, candidates) in graph.candidates.iter() {
        if excluded.contains(pair) || candidates.len() < min_candidates {
            continue;
        }
        by_width.push_back(Reverse(candidates.len()), *pair);
    }
    let ordered: Vec<RoomPair> = by_width.into();

    let mut added = 0;
    for pair in ordered {
        if added >= budget {
            break;
        }
        let Some(chosen) = pick_most_open(grid, graph.candidates_for(pair), rng) else {
            continue;
        };
        if grid.carve(chosen.wall) {
            added += 1;
        }
    }
    log::debug!("added {added} of {budget} loop doors");
    added
}

fn add_loops_after_tunnel<R>(
    grid: &mut Grid,
    spawns: SpawnPair,
    config: &MapGeneratorConfig,
    rng: &mut R,
) -> usize
where
    R: Rng + ?Sized,
{
    let room_map = extract_rooms(grid);
    let graph = build_room_graph(grid, &room_map);
    if graph.is_empty() {
        return 0;
    }

    let path = match (room_map.room_at(spawns.start), room_map.room_at(spawns.goal)) {
        (Some(start_room), Some(goal_room)) => graph.room_path(start_room, goal_room),
        _ => None,
    };
    match path {
        Some(path) if path.len() > 1 => {
            let base = REBUILT_LOOP_BASE_DOORS.max(path.len() - 1);
            let budget =
                REBUILT_MIN_LOOP_DOORS.max(scaled_loop_budget(base, config.loop_door_ratio));
            add_loop_doors(
                grid,
                &graph,
                &path_edges(&path),
                LOOP_EDGE_MIN_CANDIDATES,
                budget,
                rng,
            )
        }
        _ => add_loop_doors(
            grid,
            &graph,
            &BTreeSet::new(),
            NO_PATH_LOOP_EDGE_MIN_CANDIDATES,
            NO_PATH_LOOP_DOORS,
            rng,
        ),
    }
}
