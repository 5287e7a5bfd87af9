//! CPU-side mesh data.
//!
//! Geometry is built here once and uploaded by a [`RenderBackend`](crate::render::RenderBackend).
//! The board needs only two shapes: an axis-aligned box for the cell bodies
//! and the box's hard edges for the outlines.

use std::collections::{HashMap, hash_map::Entry};

use cgmath::InnerSpace;

/// Vertex types describe their own buffer layout to the pipeline.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
}

#[derive(Clone, Debug)]
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl MeshData {
    /// An axis-aligned box centred on the origin with per-face normals.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
        // (normal, tangent u, tangent v) per face; u x v == normal keeps the winding CCW
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let half = [hx, hy, hz];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let position = std::array::from_fn(|axis| {
                    (normal[axis] + u[axis] * su + v[axis] * sv) * half[axis]
                });
                vertices.push(ModelVertex { position, normal });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self {
            vertices,
            indices,
            topology: Topology::Triangles,
        }
    }

    /// Line segments along every edge where adjacent faces meet at more than
    /// `threshold_deg`, plus boundary edges. Coplanar triangle diagonals are dropped.
    pub fn edges(&self, threshold_deg: f32) -> Self {
        let cos_threshold = threshold_deg.to_radians().cos();
        let key = |p: [f32; 3]| p.map(|c| (c * 1.0e4).round() as i64);

        struct Edge {
            from: [f32; 3],
            to: [f32; 3],
            normal: cgmath::Vector3<f32>,
            faces: u32,
            hard: bool,
        }
        let mut edges: HashMap<([i64; 3], [i64; 3]), Edge> = HashMap::new();
        let mut order = Vec::new();

        for tri in self.indices.chunks_exact(3) {
            let p = [tri[0], tri[1], tri[2]].map(|i| self.vertices[i as usize].position);
            let a: cgmath::Vector3<f32> = p[0].into();
            let b: cgmath::Vector3<f32> = p[1].into();
            let c: cgmath::Vector3<f32> = p[2].into();
            let normal = (b - a).cross(c - a);
            if normal.magnitude2() == 0.0 {
                continue;
            }
            let normal = normal.normalize();
            for (from, to) in [(p[0], p[1]), (p[1], p[2]), (p[2], p[0])] {
                let (ka, kb) = (key(from), key(to));
                let edge_key = if ka <= kb { (ka, kb) } else { (kb, ka) };
                match edges.entry(edge_key) {
                    Entry::Occupied(mut entry) => {
                        let edge = entry.get_mut();
                        edge.faces += 1;
                        if edge.normal.dot(normal) <= cos_threshold {
                            edge.hard = true;
                        }
                    }
                    Entry::Vacant(entry) => {
                        order.push(edge_key);
                        entry.insert(Edge { from, to, normal, faces: 1, hard: false });
                    }
                }
            }
        }

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for edge_key in order {
            let edge = &edges[&edge_key];
            if edge.faces == 1 || edge.hard {
                let base = vertices.len() as u32;
                vertices.push(ModelVertex { position: edge.from, normal: [0.0; 3] });
                vertices.push(ModelVertex { position: edge.to, normal: [0.0; 3] });
                indices.extend_from_slice(&[base, base + 1]);
            }
        }
        Self {
            vertices,
            indices,
            topology: Topology::Lines,
        }
    }

    pub fn primitive_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::Lines => self.indices.len() / 2,
        }
    }
}
