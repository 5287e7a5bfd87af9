//! The journey path: shared cell resources and the board builder.
//!
//! All 100 cells draw with the same six GPU resources owned by
//! [`SharedResources`]. Cells only hold scene handles, so removing a cell never
//! touches a shared geometry or material, and the pool itself is released in
//! one step after the last cell is gone.

use std::collections::HashSet;

use cgmath::Vector3;

use crate::{
    config::{BOARD_CELLS, BoardStyle},
    data_structures::{
        geometry::MeshData,
        instance::Instance,
        scene_graph::{NodeId, Scene, SceneNode},
    },
    render::{GeometryId, Material, MaterialId, RenderBackend},
};

/// Faces meeting at more than this angle get an outline.
const EDGE_THRESHOLD_DEG: f32 = 1.0;

/// Centre of the cell with the 0-based index `index`.
pub fn cell_position(style: &BoardStyle, index: u32) -> Vector3<f32> {
    let i = index as f32;
    Vector3::new(0.0, i * style.step_rise, -i * style.step_depth)
}

/// Geometry and materials reused by every cell.
#[derive(Debug)]
pub struct SharedResources {
    pub body_geometry: GeometryId,
    pub body_material: MaterialId,
    pub special_body_material: MaterialId,
    pub outline_geometry: GeometryId,
    pub outline_material: MaterialId,
    pub special_outline_material: MaterialId,
}

impl SharedResources {
    pub fn allocate(backend: &mut impl RenderBackend, style: &BoardStyle) -> Self {
        let [w, h, d] = style.cell_size;
        let body = MeshData::cuboid(w, h, d);
        let outline = body.edges(EDGE_THRESHOLD_DEG);
        Self {
            body_geometry: backend.create_geometry("cell body", &body),
            body_material: backend.create_material(Material::opaque(style.body_colour)),
            special_body_material: backend
                .create_material(Material::translucent(style.special_body_colour)),
            outline_geometry: backend.create_geometry("cell outline", &outline),
            // only ordinary borders fight with the body; special ones stay unbiased
            outline_material: backend.create_material(
                Material::lines(style.outline_colour).with_depth_bias(style.outline_depth_bias),
            ),
            special_outline_material: backend
                .create_material(Material::lines(style.special_outline_colour)),
        }
    }

    /// Releases the pool. Consuming `self` makes a second release impossible.
    pub fn dispose(self, backend: &mut impl RenderBackend) {
        backend.dispose_geometry(self.body_geometry);
        backend.dispose_material(self.body_material);
        backend.dispose_material(self.special_body_material);
        backend.dispose_geometry(self.outline_geometry);
        backend.dispose_material(self.outline_material);
        backend.dispose_material(self.special_outline_material);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardCell {
    /// 1-based position on the journey.
    pub index: u32,
    pub special: bool,
    pub body: NodeId,
    pub outline: NodeId,
}

/// Every cell attached to the scene, kept for teardown.
#[derive(Debug, Default)]
pub struct Board {
    cells: Vec<BoardCell>,
}

impl Board {
    pub fn cells(&self) -> &[BoardCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Detaches every cell. Shared geometry and materials are left alone.
    pub fn remove_from(self, scene: &mut Scene) {
        for cell in self.cells {
            scene.remove(cell.body);
            scene.remove(cell.outline);
        }
    }
}

/// Lays out the full path in one pass. Positions outside `1..=100` in
/// `special_positions` are ignored.
pub fn build_board(
    scene: &mut Scene,
    shared: &SharedResources,
    style: &BoardStyle,
    special_positions: &HashSet<u32>,
) -> Board {
    let cells = (1..=BOARD_CELLS)
        .map(|index| {
            let special = special_positions.contains(&index);
            let position = cell_position(style, index - 1);
            let (body_material, outline_material) = if special {
                (shared.special_body_material, shared.special_outline_material)
            } else {
                (shared.body_material, shared.outline_material)
            };
            let body = scene.add(SceneNode {
                geometry: shared.body_geometry,
                material: body_material,
                transform: Instance::from(position),
            });
            let outline = scene.add(SceneNode {
                geometry: shared.outline_geometry,
                material: outline_material,
                transform: Instance::from(position).with_scale(style.outline_scale),
            });
            BoardCell {
                index,
                special,
                body,
                outline,
            }
        })
        .collect();
    Board { cells }
}
