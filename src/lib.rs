//! Procedural cave maps on a wall/floor grid.
//!
//! [`generate_map`] fills a grid with cellular-automata noise and makes sure
//! the two spawn cells it picks are connected. [`generate_level`] also widens
//! the main route and finds chokepoints, doors and throats for gate placement.

pub mod btree_key_values;
pub mod chokepoint;
pub mod connectivity;
pub mod constants;
pub mod door_locator;
pub mod extract_rooms;
pub mod generate_map;
pub mod generate_walls;
pub mod grid;
pub mod road_width;
pub mod room;
pub mod room_connection;
pub mod throat;
pub mod tunnel;
pub mod world;

pub use chokepoint::{find_chokepoints, ChokeLink, ChokepointKind, ChokepointNode};
pub use connectivity::{FallbackReason, GenerationOutcome, PlannerStage, SpawnPair};
pub use constants::{Axis, Direction4};
pub use door_locator::{find_doors, DoorLink, DoorLocation, DoorPickMode};
pub use extract_rooms::{extract_rooms, RoomMap};
pub use generate_map::{
    generate_level, generate_level_with_rng, generate_map, generate_map_with_rng, GeneratedMap,
    Level, MapGeneratorConfig, MapGeneratorError,
};
pub use grid::{Cell, Grid};
pub use road_width::{RoadWidening, RoadWidthConfig};
pub use room::{Room, RoomId};
pub use room_connection::{build_room_graph, RoomGraph, RoomPair, WallCandidate};
pub use throat::{find_throats, Throat};
pub use world::{FenceAnchor, GridTransform};
