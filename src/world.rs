use crate::constants::Axis;
use crate::door_locator::DoorLink;
use crate::grid::{Cell, Grid};
use crate::throat::Throat;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Maps grid cells onto the X/Z plane of a world: `x` goes to X, `y` to Z,
/// and the height is supplied per call.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTransform {
    /// World position of the centre of cell (0, 0), ignoring Y.
    pub origin: Vector3<f32>,
    pub cell_size: f32,
}

/// Where a fence goes: centred on `center`, running along `axis`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FenceAnchor {
    pub center: Vector3<f32>,
    pub axis: Axis,
    pub half_length: f32,
    /// Open cells the fence has to cover, `1..=3`.
    pub span: usize,
}

impl FenceAnchor {
    pub fn endpoints(&self) -> (Vector3<f32>, Vector3<f32>) {
        let along = world_axis(self.axis) * self.half_length;
        (self.center - along, self.center + along)
    }
}

fn world_axis(axis: Axis) -> Vector3<f32> {
    match axis {
        Axis::Horizontal => Vector3::x(),
        Axis::Vertical => Vector3::z(),
    }
}

impl GridTransform {
    /// A grid of `width x height` cells centred on `base_center`.
    pub fn centered_on(base_center: Vector3<f32>, width: usize, height: usize, cell_size: f32) -> Self {
        let half = cell_size * 0.5;
        let origin = Vector3::new(
            base_center.x - width as f32 * half + half,
            0.0,
            base_center.z - height as f32 * half + half,
        );
        GridTransform { origin, cell_size }
    }

    pub fn cell_to_world(&self, cell: Cell, y: f32) -> Vector3<f32> {
        Vector3::new(
            self.origin.x + cell.x as f32 * self.cell_size,
            y,
            self.origin.z + cell.y as f32 * self.cell_size,
        )
    }

    /// Fence across the link between two adjacent floor cells, sized to the
    /// wider of the two openings. `None` unless `a` and `b` are 4-adjacent.
    pub fn fence_for_link(
        &self,
        grid: &Grid,
        a: Cell,
        b: Cell,
        length_factor: f32,
        y: f32,
    ) -> Option<FenceAnchor> {
        if !a.is_adjacent(&b) {
            return None;
        }
        let center = (self.cell_to_world(a, y) + self.cell_to_world(b, y)) * 0.5;
        Some(self.fence_between(grid, a, b, center, length_factor))
    }

    /// Fence over the wall cell of a door contact.
    pub fn fence_for_door(&self, grid: &Grid, door: &DoorLink, length_factor: f32, y: f32) -> FenceAnchor {
        let center = self.cell_to_world(door.wall, y);
        self.fence_between(grid, door.cell_a, door.cell_b, center, length_factor)
    }

    fn fence_between(
        &self,
        grid: &Grid,
        a: Cell,
        b: Cell,
        center: Vector3<f32>,
        length_factor: f32,
    ) -> FenceAnchor {
        let link_axis = if a.x != b.x {
            Axis::Horizontal
        } else {
            Axis::Vertical
        };
        let axis = link_axis.perpendicular();
        let span = grid.open_span(a, axis).max(grid.open_span(b, axis));
        FenceAnchor {
            center,
            axis,
            half_length: self.half_length(span, length_factor),
            span,
        }
    }

    pub fn fence_for_throat(&self, throat: &Throat, length_factor: f32, y: f32) -> FenceAnchor {
        FenceAnchor {
            center: self.cell_to_world(throat.cell, y),
            axis: throat.corridor.perpendicular(),
            half_length: self.half_length(throat.span, length_factor),
            span: throat.span,
        }
    }

    fn half_length(&self, span: usize, length_factor: f32) -> f32 {
        self.cell_size * length_factor * 0.5 * span as f32
    }
}
