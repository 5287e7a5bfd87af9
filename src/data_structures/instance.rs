//! Transform data for scene nodes and its GPU layout.
//!
//! Every node in the scene carries an [`Instance`]. At draw time the backend
//! packs it, together with the node's material colour and depth bias, into an
//! [`InstanceRaw`] and hands it to the shader as per-instance vertex data.

use std::ops::Mul;

use cgmath::{One, SquareMatrix};

use crate::data_structures::geometry::Vertex;

/// Position, rotation (as quaternion) and scale of a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_scale(mut self, scale: impl Into<cgmath::Vector3<f32>>) -> Self {
        self.scale = scale.into();
        self
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self, colour: [f32; 4], depth_bias: f32) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        // mirrored transforms flip the winding; keep the normal pointing outwards
        let handedness = world_matrix.determinant().signum();
        let normal = cgmath::Matrix3::from(self.rotation) * handedness;
        InstanceRaw {
            model: world_matrix.into(),
            normal: normal.into(),
            depth_bias,
            colour,
        }
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    /// Composes a parent (`self`) with a child transform, yielding the child's world transform.
    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU: world matrix, normal
 * matrix, a clip-space depth offset and the flat material colour.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 3]; 3],
    pub depth_bias: f32,
    pub colour: [f32; 4],
}

/**
 * Stride layout: world matrix as four vec4 (slots 5-8), normal matrix as three
 * vec3 (slots 9-11), depth bias (slot 12) and colour (slot 13).
 */
impl Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // the shader only advances to the next element when it starts a new instance
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 26]>() as wgpu::BufferAddress,
                    shader_location: 13,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Rotation3, Vector3};

    use super::*;

    #[test]
    fn should_compose_parent_scale_into_child_offset() {
        let parent = Instance::from(Vector3::new(0.0, 1.0, 0.0)).with_scale([0.1, 0.1, 0.1]);
        let child = Instance::from(Vector3::new(10.0, 0.0, 0.0));
        let world = &parent * &child;
        assert_relative_eq!(world.position, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-6);
        assert_eq!(world.scale, Vector3::new(0.1, 0.1, 0.1));
    }

    #[test]
    fn should_rotate_child_offset_by_parent() {
        let mut parent = Instance::new();
        parent.rotation = cgmath::Quaternion::from_angle_y(cgmath::Deg(90.0));
        let child = Instance::from(Vector3::new(1.0, 0.0, 0.0));
        let world = parent * child;
        assert_relative_eq!(world.position, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }

    #[test]
    fn should_pack_translation_into_last_column() {
        let raw = Instance::from(Vector3::new(1.0, 2.0, 3.0)).to_raw([0.5; 4], 0.25);
        assert_eq!(raw.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(raw.colour, [0.5; 4]);
        assert_eq!(raw.depth_bias, 0.25);
    }

    #[test]
    fn should_match_attribute_offsets_with_struct_size() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), std::mem::size_of::<[f32; 30]>());
    }
}
