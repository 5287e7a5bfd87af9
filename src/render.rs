//! The rendering-context seam and draw batching.
//!
//! [`RenderBackend`] is everything the engine needs from a GPU: create and
//! dispose geometry, materials and lights, resize the surface, draw a scene and
//! tear itself down. The wgpu [`Context`](crate::context::Context) and the
//! recording [`HeadlessBackend`](crate::headless::HeadlessBackend) implement it.
//!
//! # Key types
//!
//! - [`Material`] is a flat colour plus a [`Surface`] that picks the pipeline
//! - [`Light`] is an ambient or directional light
//! - [`FrameBatches`] groups scene nodes into instanced draws per pipeline
//!

use std::{collections::BTreeMap, ops::Range};

use slotmap::new_key_type;
use thiserror::Error;

use crate::{
    camera::Camera,
    data_structures::{geometry::MeshData, instance::InstanceRaw, scene_graph::Scene},
};

new_key_type! {
    pub struct GeometryId;
    pub struct MaterialId;
    pub struct LightId;
}

/// Selects the pipeline a material is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Surface {
    /// Lit, depth-writing triangles.
    Opaque,
    /// Unlit line list.
    Lines,
    /// Lit, alpha-blended triangles drawn after everything else.
    Translucent,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub colour: [f32; 4],
    pub surface: Surface,
    /// Constant clip-space depth offset; positive values push fragments away from the camera.
    pub depth_bias: f32,
}

impl Material {
    pub fn opaque(colour: [f32; 4]) -> Self {
        Self {
            colour,
            surface: Surface::Opaque,
            depth_bias: 0.0,
        }
    }

    pub fn translucent(colour: [f32; 4]) -> Self {
        Self {
            colour,
            surface: Surface::Translucent,
            depth_bias: 0.0,
        }
    }

    pub fn lines(colour: [f32; 4]) -> Self {
        Self {
            colour,
            surface: Surface::Lines,
            depth_bias: 0.0,
        }
    }

    pub fn with_depth_bias(mut self, depth_bias: f32) -> Self {
        self.depth_bias = depth_bias;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Ambient {
        colour: [f32; 3],
        intensity: f32,
    },
    Directional {
        colour: [f32; 3],
        intensity: f32,
        /// The light shines from this point towards the origin.
        position: cgmath::Vector3<f32>,
    },
}

#[derive(Debug, Error)]
pub enum DrawError {
    /// The surface or device is gone; the context cannot be used again.
    #[error("rendering context lost")]
    ContextLost,
    #[error("draw failed: {0}")]
    Other(String),
}

pub trait RenderBackend {
    fn create_geometry(&mut self, label: &str, mesh: &MeshData) -> GeometryId;

    fn create_material(&mut self, material: Material) -> MaterialId;

    fn create_light(&mut self, light: Light) -> LightId;

    /// Releases a geometry. Disposing an unknown or already disposed id is a no-op.
    fn dispose_geometry(&mut self, id: GeometryId);

    fn dispose_material(&mut self, id: MaterialId);

    fn dispose_light(&mut self, id: LightId);

    /// Reconfigures the surface. Zero-sized dimensions are ignored.
    fn resize(&mut self, width: u32, height: u32);

    /// Issues one frame. Never mutates the scene or the camera.
    fn draw(&mut self, scene: &Scene, camera: &Camera) -> Result<(), DrawError>;

    /// Releases every remaining GPU resource. Drawing afterwards is a no-op.
    fn dispose(&mut self);
}

/// One instanced draw: every node sharing a geometry and material.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub surface: Surface,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub instances: Range<u32>,
}

/// Per-frame draw list. `instances` is uploaded as one buffer and each batch
/// addresses its slice of it.
#[derive(Debug, Default)]
pub struct FrameBatches {
    pub batches: Vec<Batch>,
    pub instances: Vec<InstanceRaw>,
}

impl FrameBatches {
    /// Groups the scene's nodes by (surface, geometry, material). Opaque batches
    /// come first, then lines, then translucent ones so blending sees the finished
    /// opaque depth buffer.
    pub fn collect(scene: &Scene, material: impl Fn(MaterialId) -> Option<Material>) -> Self {
        let mut groups: BTreeMap<(Surface, GeometryId, MaterialId), Vec<InstanceRaw>> =
            BTreeMap::new();
        for (_, node) in scene.nodes() {
            let Some(mat) = material(node.material) else {
                log::warn!("skipping a scene node whose material was already disposed");
                continue;
            };
            groups
                .entry((mat.surface, node.geometry, node.material))
                .or_default()
                .push(node.transform.to_raw(mat.colour, mat.depth_bias));
        }

        let mut frame = FrameBatches::default();
        for ((surface, geometry, material), mut raws) in groups {
            let start = frame.instances.len() as u32;
            frame.instances.append(&mut raws);
            frame.batches.push(Batch {
                surface,
                geometry,
                material,
                instances: start..frame.instances.len() as u32,
            });
        }
        frame
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}
