//! CLI that prints a generated cave level.

use cave_grid_generator::{
    generate_level, ChokeLink, ChokepointKind, DoorLink, DoorPickMode, FenceAnchor,
    GenerationOutcome, GridTransform, MapGeneratorConfig, PlannerStage, SpawnPair, Throat,
};
use clap::{Parser, ValueEnum};
use nalgebra::Vector3;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DoorPick {
    Random,
    Midpoint,
    Throat,
}

impl From<DoorPick> for DoorPickMode {
    fn from(pick: DoorPick) -> Self {
        match pick {
            DoorPick::Random => DoorPickMode::RandomPerPair,
            DoorPick::Midpoint => DoorPickMode::MidpointOfContacts,
            DoorPick::Throat => DoorPickMode::ThroatHeuristic,
        }
    }
}

/// Cave map generator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON file with a full generator config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid width
    #[arg(long)]
    width: Option<usize>,

    /// Grid height
    #[arg(long)]
    height: Option<usize>,

    /// Initial wall probability
    #[arg(long)]
    fill: Option<f64>,

    /// Minimum Manhattan distance between the spawns
    #[arg(long)]
    min_distance: Option<usize>,

    /// Door selection policy
    #[arg(long, value_enum)]
    door_pick: Option<DoorPick>,

    /// Skip corridor widening
    #[arg(long)]
    no_widen: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// World size of one cell for fence anchors in the JSON summary
    #[arg(long, default_value_t = 1.0)]
    cell_size: f32,

    /// Fence length per open cell, in cells
    #[arg(long, default_value_t = 1.0)]
    fence_length: f32,

    /// Print a JSON summary instead of the map
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    width: usize,
    height: usize,
    spawns: Option<SpawnPair>,
    outcome: GenerationOutcome,
    trace: &'a [PlannerStage],
    rooms: usize,
    chokepoints: Vec<(ChokepointKind, &'a [ChokeLink])>,
    doors: &'a [DoorLink],
    throats: &'a [Throat],
    fences: Vec<FenceAnchor>,
    gates: Vec<FenceAnchor>,
    map: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => MapGeneratorConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(fill) = args.fill {
        config.initial_wall_fill = fill;
    }
    if let Some(min_distance) = args.min_distance {
        config.min_spawn_manhattan_distance = min_distance;
    }
    if let Some(door_pick) = args.door_pick {
        config.door_pick_mode = door_pick.into();
    }
    if args.no_widen {
        config.road_width = None;
    }

    let level = generate_level(&config, args.seed)?;
    let map = level.render();

    if args.json {
        let transform = GridTransform::centered_on(
            Vector3::zeros(),
            level.map.grid.width(),
            level.map.grid.height(),
            args.cell_size,
        );
        let summary = Summary {
            width: level.map.grid.width(),
            height: level.map.grid.height(),
            spawns: level.map.spawns,
            outcome: level.map.outcome,
            trace: &level.map.trace,
            rooms: level.doors.room_map.len(),
            chokepoints: level
                .chokepoints
                .iter()
                .map(|node| (node.kind, node.options.as_slice()))
                .collect(),
            doors: &level.doors.selected,
            throats: &level.throats,
            fences: level.fence_anchors(&transform, config.max_fence_count, args.fence_length, 0.0),
            gates: level.gate_anchors(&transform, args.fence_length, 0.0),
            map,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", map.join("\n"));
        println!("{:?}", level.map.outcome);
    }
    Ok(())
}
