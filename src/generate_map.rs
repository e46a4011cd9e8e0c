use crate::chokepoint::{find_chokepoints, ChokepointNode};
use crate::connectivity::{connect_spawns, GenerationOutcome, PlannerStage, SpawnPair};
use crate::door_locator::{find_doors, DoorLocation, DoorPickMode};
use crate::extract_rooms::extract_rooms;
use crate::generate_walls::generate_walls;
use crate::grid::{Cell, Grid};
use crate::road_width::{widen_main_route, RoadWidening, RoadWidthConfig, MAX_ROAD_WIDTH};
use crate::throat::{find_throats, Throat};
use crate::world::{FenceAnchor, GridTransform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapGeneratorConfig {
    pub width: usize,
    pub height: usize,
    /// Chance of an interior cell starting as wall before smoothing.
    pub initial_wall_fill: f64,
    pub min_spawn_manhattan_distance: usize,
    /// Extra loop doors as a fraction of the doors carved along the room path.
    pub loop_door_ratio: f64,
    /// Sampling attempts per spawn cell.
    pub spawn_pick_tries: usize,
    /// Corridor widening along the start-goal route. `None` disables it.
    pub road_width: Option<RoadWidthConfig>,
    pub max_cut_options: usize,
    pub pick_one_door_per_pair: bool,
    pub door_pick_mode: DoorPickMode,
    /// Seed of the door locator's own stream.
    pub door_seed: u64,
    pub min_fence_spacing: usize,
    /// 0 = no limit.
    pub max_fence_count: usize,
}

impl Default for MapGeneratorConfig {
    fn default() -> Self {
        MapGeneratorConfig {
            width: 256,
            height: 256,
            initial_wall_fill: 0.38,
            min_spawn_manhattan_distance: 80,
            loop_door_ratio: 0.25,
            spawn_pick_tries: 30_000,
            road_width: Some(RoadWidthConfig::default()),
            max_cut_options: 24,
            pick_one_door_per_pair: true,
            door_pick_mode: DoorPickMode::ThroatHeuristic,
            door_seed: 12345,
            min_fence_spacing: 6,
            max_fence_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapGeneratorError {
    #[error("grid must be at least 3x3, got {width}x{height}")]
    GridTooSmall { width: usize, height: usize },
    #[error("initial wall fill {0} is outside [0, 1]")]
    WallFillOutOfRange(f64),
    #[error("loop door ratio {0} must be finite and non-negative")]
    InvalidLoopDoorRatio(f64),
    #[error("road width {0} is outside 1..=3")]
    RoadWidthOutOfRange(usize),
    #[error("road width chance {0} is outside [0, 1]")]
    RoadChanceOutOfRange(f64),
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

impl MapGeneratorConfig {
    pub fn validate(&self) -> Result<(), MapGeneratorError> {
        if self.width < 3 || self.height < 3 {
            return Err(MapGeneratorError::GridTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        if !is_probability(self.initial_wall_fill) {
            return Err(MapGeneratorError::WallFillOutOfRange(self.initial_wall_fill));
        }
        if !self.loop_door_ratio.is_finite() || self.loop_door_ratio < 0.0 {
            return Err(MapGeneratorError::InvalidLoopDoorRatio(self.loop_door_ratio));
        }
        if let Some(road) = &self.road_width {
            if !(1..=MAX_ROAD_WIDTH).contains(&road.max_width) {
                return Err(MapGeneratorError::RoadWidthOutOfRange(road.max_width));
            }
            for chance in [road.width2_chance, road.width3_chance] {
                if !is_probability(chance) {
                    return Err(MapGeneratorError::RoadChanceOutOfRange(chance));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMap {
    pub grid: Grid,
    pub spawns: Option<SpawnPair>,
    pub outcome: GenerationOutcome,
    pub trace: Vec<PlannerStage>,
}

fn create_rng(seed: Option<u64>) -> StdRng {
    seed.map(SeedableRng::seed_from_u64)
        .unwrap_or_else(StdRng::from_entropy)
}

/// Generates a walled map with reachable spawns. `None` seeds from entropy.
pub fn generate_map(
    config: &MapGeneratorConfig,
    seed: Option<u64>,
) -> Result<GeneratedMap, MapGeneratorError> {
    let mut rng = create_rng(seed);
    generate_map_with_rng(config, &mut rng)
}

pub fn generate_map_with_rng<R>(
    config: &MapGeneratorConfig,
    rng: &mut R,
) -> Result<GeneratedMap, MapGeneratorError>
where
    R: Rng + ?Sized,
{
    config.validate()?;

    let mut grid = generate_walls(config.width, config.height, config.initial_wall_fill, rng);
    log::debug!(
        "walls generated: {}x{}, {} floor cells",
        grid.width(),
        grid.height(),
        grid.floor_count()
    );
    let report = connect_spawns(&mut grid, config, rng);

    log::info!(
        "map {}x{} generated: {:?}, {} rooms",
        grid.width(),
        grid.height(),
        report.outcome,
        extract_rooms(&grid).len()
    );
    Ok(GeneratedMap {
        grid,
        spawns: report.spawns,
        outcome: report.outcome,
        trace: report.trace,
    })
}

/// A generated map plus everything the placement stages read from it.
#[derive(Debug, Clone)]
pub struct Level {
    pub map: GeneratedMap,
    pub widening: Option<RoadWidening>,
    pub chokepoints: Vec<ChokepointNode>,
    pub doors: DoorLocation,
    /// Only filled when no door was selected.
    pub throats: Vec<Throat>,
}

impl Level {
    /// Runs the placement stages on `map`, drawing from `rng` in this order:
    /// road widening, chokepoints, throats. Doors use their own stream seeded
    /// by `door_seed`. Widening and chokepoints need the spawns of a map that
    /// did not fall back to border walls.
    pub fn build<R>(config: &MapGeneratorConfig, mut map: GeneratedMap, rng: &mut R) -> Level
    where
        R: Rng + ?Sized,
    {
        let spawns = map.spawns.filter(|_| !map.outcome.is_degraded());

        let widening = match (&config.road_width, spawns) {
            (Some(road), Some(spawns)) => Some(widen_main_route(
                &mut map.grid,
                spawns.start,
                spawns.goal,
                road,
                rng,
            )),
            _ => None,
        };

        let chokepoints = match spawns {
            Some(spawns) => find_chokepoints(
                &map.grid,
                spawns.start,
                spawns.goal,
                config.max_cut_options,
                rng,
            ),
            None => vec![],
        };

        let doors = find_doors(
            &map.grid,
            config.pick_one_door_per_pair,
            config.door_pick_mode,
            config.door_seed,
        );

        let throats = if doors.selected.is_empty() {
            find_throats(
                &map.grid,
                config.min_fence_spacing,
                config.max_fence_count,
                rng,
            )
        } else {
            vec![]
        };

        Level {
            map,
            widening,
            chokepoints,
            doors,
            throats,
        }
    }

    /// Fence anchors over the selected doors, or over the throats when the
    /// map has no doors, capped at `max_count` (0 = all).
    pub fn fence_anchors(
        &self,
        transform: &GridTransform,
        max_count: usize,
        length_factor: f32,
        y: f32,
    ) -> Vec<FenceAnchor> {
        let limit = if max_count == 0 { usize::MAX } else { max_count };
        let grid = &self.map.grid;
        if self.doors.selected.is_empty() {
            self.throats
                .iter()
                .take(limit)
                .map(|throat| transform.fence_for_throat(throat, length_factor, y))
                .collect()
        } else {
            self.doors
                .selected
                .iter()
                .take(limit)
                .map(|door| transform.fence_for_door(grid, door, length_factor, y))
                .collect()
        }
    }

    /// One anchor per chokepoint option, in node order.
    pub fn gate_anchors(&self, transform: &GridTransform, length_factor: f32, y: f32) -> Vec<FenceAnchor> {
        self.chokepoints
            .iter()
            .flat_map(|node| node.options.iter())
            .filter_map(|link| {
                transform.fence_for_link(&self.map.grid, link.from, link.to, length_factor, y)
            })
            .collect()
    }

    /// Rows of `#` wall and `.` floor, with `S`/`G` spawns, `+` chokepoint
    /// gates, `D` selected door walls and `T` throats drawn on top.
    pub fn render(&self) -> Vec<String> {
        let grid = &self.map.grid;
        let mut marks: BTreeMap<Cell, char> = BTreeMap::new();
        for throat in &self.throats {
            marks.insert(throat.cell, 'T');
        }
        for door in &self.doors.selected {
            marks.insert(door.wall, 'D');
        }
        for gate in self.chokepoints.iter().flat_map(|node| node.gates()) {
            marks.insert(gate, '+');
        }
        if let Some(spawns) = self.map.spawns {
            marks.insert(spawns.start, 'S');
            marks.insert(spawns.goal, 'G');
        }

        (0..grid.height())
            .map(|y| {
                (0..grid.width())
                    .map(|x| {
                        let cell = Cell::new(x, y);
                        marks
                            .get(&cell)
                            .copied()
                            .unwrap_or(if grid.is_wall(cell) { '#' } else { '.' })
                    })
                    .collect()
            })
            .collect()
    }
}

/// Full pipeline: map generation followed by [`Level::build`] on the same
/// stream. `None` seeds from entropy.
pub fn generate_level(config: &MapGeneratorConfig, seed: Option<u64>) -> Result<Level, MapGeneratorError> {
    let mut rng = create_rng(seed);
    generate_level_with_rng(config, &mut rng)
}

pub fn generate_level_with_rng<R>(
    config: &MapGeneratorConfig,
    rng: &mut R,
) -> Result<Level, MapGeneratorError>
where
    R: Rng + ?Sized,
{
    let map = generate_map_with_rng(config, rng)?;
    Ok(Level::build(config, map, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::FallbackReason;
    use crate::constants::Axis;
    use nalgebra::Vector3;

    fn small_config() -> MapGeneratorConfig {
        MapGeneratorConfig {
            width: 48,
            height: 36,
            min_spawn_manhattan_distance: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        assert_eq!(MapGeneratorConfig::default().validate(), Ok(()));

        let config = MapGeneratorConfig {
            width: 2,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(MapGeneratorError::GridTooSmall {
                width: 2,
                height: 256
            })
        );

        let config = MapGeneratorConfig {
            initial_wall_fill: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            generate_map(&config, Some(0)),
            Err(MapGeneratorError::WallFillOutOfRange(_))
        ));

        let config = MapGeneratorConfig {
            loop_door_ratio: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MapGeneratorConfig {
            road_width: Some(RoadWidthConfig {
                max_width: 4,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(MapGeneratorError::RoadWidthOutOfRange(4))
        );
    }

    #[test]
    fn test_error_message() {
        let err = MapGeneratorError::GridTooSmall {
            width: 1,
            height: 9,
        };
        assert_eq!(err.to_string(), "grid must be at least 3x3, got 1x9");
    }

    #[test]
    fn test_same_seed_same_map() {
        let config = small_config();
        let a = generate_map(&config, Some(42)).unwrap();
        let b = generate_map(&config, Some(42)).unwrap();
        assert_eq!(a, b);
        assert!(a.grid.has_wall_border());
        if !a.outcome.is_degraded() {
            let spawns = a.spawns.unwrap();
            assert!(a.grid.is_reachable(spawns.start, spawns.goal));
        }
    }

    #[test]
    fn test_open_map_has_no_spawns_at_default_distance() {
        let config = MapGeneratorConfig {
            width: 10,
            height: 10,
            initial_wall_fill: 0.0,
            ..Default::default()
        };
        let level = generate_level(&config, Some(1)).unwrap();
        assert_eq!(level.map.spawns, None);
        assert_eq!(
            level.map.outcome,
            GenerationOutcome::FallbackBorderOnly(FallbackReason::SpawnPickFailed)
        );
        assert!(level.chokepoints.is_empty());
        assert_eq!(level.widening, None);
        assert_eq!(extract_rooms(&level.map.grid).len(), 1);
    }

    #[test]
    fn test_level_is_deterministic() {
        let config = small_config();
        let a = generate_level(&config, Some(7)).unwrap();
        let b = generate_level(&config, Some(7)).unwrap();
        assert_eq!(a.map, b.map);
        assert_eq!(a.chokepoints, b.chokepoints);
        assert_eq!(a.doors.selected, b.doors.selected);
        assert_eq!(a.throats, b.throats);
        assert_eq!(a.widening, b.widening);
    }

    #[test]
    fn test_config_from_json() {
        let config: MapGeneratorConfig =
            serde_json::from_str(r#"{"width": 64, "road_width": null}"#).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 256);
        assert_eq!(config.road_width, None);
    }

    fn fixture_map(rows: &[&str], spawns: Option<SpawnPair>, outcome: GenerationOutcome) -> GeneratedMap {
        GeneratedMap {
            grid: Grid::from_ascii(rows),
            spawns,
            outcome,
            trace: vec![],
        }
    }

    const PILLAR: [&str; 7] = [
        "#######", //
        "#.....#", //
        "#.....#", //
        "#..#..#", //
        "#.....#", //
        "#.....#", //
        "#######", //
    ];

    fn pillar_spawns() -> Option<SpawnPair> {
        Some(SpawnPair {
            start: Cell::new(1, 1),
            goal: Cell::new(5, 5),
        })
    }

    const ROOM_PATH: GenerationOutcome = GenerationOutcome::RoomPath {
        doors_carved: 0,
        loop_doors: 0,
    };

    #[test]
    fn test_open_map_level() {
        let config = MapGeneratorConfig {
            width: 10,
            height: 10,
            initial_wall_fill: 0.0,
            min_spawn_manhattan_distance: 5,
            ..Default::default()
        };
        let level = generate_level(&config, Some(5)).unwrap();
        assert!(!level.map.outcome.is_degraded());
        assert!(level.chokepoints.is_empty());
        assert!(level.doors.selected.is_empty());
        assert!(level.throats.is_empty());
        insta::assert_snapshot!(level.render().join("\n"), @r"
        ##########
        #........#
        #........#
        #.......S#
        #........#
        #........#
        #.....G..#
        #........#
        #........#
        ##########
        ");
    }

    #[test]
    fn test_level_stages_draw_in_order() {
        let config = small_config();
        for seed in 0..4 {
            let level = generate_level(&config, Some(seed)).unwrap();

            let mut rng = StdRng::seed_from_u64(seed);
            let mut map = generate_map_with_rng(&config, &mut rng).unwrap();
            let spawns = map.spawns.filter(|_| !map.outcome.is_degraded());
            let widening = spawns.zip(config.road_width).map(|(spawns, road)| {
                widen_main_route(&mut map.grid, spawns.start, spawns.goal, &road, &mut rng)
            });
            let chokepoints = spawns
                .map(|spawns| {
                    find_chokepoints(
                        &map.grid,
                        spawns.start,
                        spawns.goal,
                        config.max_cut_options,
                        &mut rng,
                    )
                })
                .unwrap_or_default();
            let doors = find_doors(
                &map.grid,
                config.pick_one_door_per_pair,
                config.door_pick_mode,
                config.door_seed,
            );
            let throats = if doors.selected.is_empty() {
                find_throats(&map.grid, config.min_fence_spacing, config.max_fence_count, &mut rng)
            } else {
                vec![]
            };

            assert_eq!(level.map, map, "seed {seed}");
            assert_eq!(level.widening, widening, "seed {seed}");
            assert_eq!(level.chokepoints, chokepoints, "seed {seed}");
            assert_eq!(level.doors.selected, doors.selected, "seed {seed}");
            assert_eq!(level.throats, throats, "seed {seed}");
        }
    }

    #[test]
    fn test_degraded_map_gets_no_widening_or_chokepoints() {
        let config = MapGeneratorConfig::default();
        let mut rng = StdRng::seed_from_u64(0);

        let healthy = Level::build(&config, fixture_map(&PILLAR, pillar_spawns(), ROOM_PATH), &mut rng);
        assert!(healthy.widening.is_some());
        assert_eq!(healthy.chokepoints.len(), 1);

        let degraded = fixture_map(
            &PILLAR,
            pillar_spawns(),
            GenerationOutcome::FallbackBorderOnly(FallbackReason::ValidationFailed),
        );
        let level = Level::build(&config, degraded, &mut rng);
        assert_eq!(level.widening, None);
        assert!(level.chokepoints.is_empty());
        let transform = GridTransform::centered_on(Vector3::zeros(), 7, 7, 1.0);
        assert!(level.gate_anchors(&transform, 1.0, 0.0).is_empty());
    }

    #[test]
    fn test_fence_anchors_cover_doors() {
        let config = MapGeneratorConfig::default();
        let rows = [
            "##########", //
            "#..#..#..#", //
            "#..#..#..#", //
            "##########", //
        ];
        let mut rng = StdRng::seed_from_u64(0);
        let level = Level::build(&config, fixture_map(&rows, None, ROOM_PATH), &mut rng);
        assert_eq!(level.doors.selected.len(), 2);
        assert!(level.throats.is_empty());

        let transform = GridTransform::centered_on(Vector3::zeros(), 10, 4, 1.0);
        let anchors = level.fence_anchors(&transform, 0, 1.0, 0.5);
        assert_eq!(anchors.len(), 2);
        for (anchor, door) in anchors.iter().zip(&level.doors.selected) {
            assert_eq!(anchor.center, transform.cell_to_world(door.wall, 0.5));
            assert_eq!(anchor.axis, Axis::Vertical);
        }
        assert_eq!(level.fence_anchors(&transform, 1, 1.0, 0.5), anchors[..1].to_vec());
    }

    #[test]
    fn test_fence_anchors_fall_back_to_throats() {
        let config = MapGeneratorConfig {
            min_fence_spacing: 0,
            ..Default::default()
        };
        let rows = ["#########", "#.......#", "#########"];
        let mut rng = StdRng::seed_from_u64(0);
        let level = Level::build(&config, fixture_map(&rows, None, ROOM_PATH), &mut rng);
        assert!(level.doors.selected.is_empty());
        assert_eq!(level.throats.len(), 5);

        let transform = GridTransform::centered_on(Vector3::zeros(), 9, 3, 2.0);
        let anchors = level.fence_anchors(&transform, 0, 1.0, 0.0);
        assert_eq!(anchors.len(), 5);
        for (anchor, throat) in anchors.iter().zip(&level.throats) {
            assert_eq!(anchor.center, transform.cell_to_world(throat.cell, 0.0));
            assert_eq!(anchor.axis, Axis::Vertical);
            assert_eq!(anchor.span, 1);
            assert_eq!(anchor.half_length, 1.0);
        }
        assert_eq!(level.fence_anchors(&transform, 2, 1.0, 0.0).len(), 2);
    }

    #[test]
    fn test_gate_anchors_one_per_option() {
        let config = MapGeneratorConfig {
            road_width: None,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let level = Level::build(&config, fixture_map(&PILLAR, pillar_spawns(), ROOM_PATH), &mut rng);
        let options = level.chokepoints.iter().map(|node| node.options.len()).sum::<usize>();
        assert_eq!(options, 6);

        let transform = GridTransform::centered_on(Vector3::zeros(), 7, 7, 1.0);
        let anchors = level.gate_anchors(&transform, 1.0, 0.0);
        assert_eq!(anchors.len(), options);
        for (anchor, link) in anchors.iter().zip(&level.chokepoints[0].options) {
            let midpoint =
                (transform.cell_to_world(link.from, 0.0) + transform.cell_to_world(link.to, 0.0)) * 0.5;
            assert_eq!(anchor.center, midpoint);
        }
    }
}
