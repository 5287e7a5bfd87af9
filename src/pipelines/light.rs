use cgmath::InnerSpace;
use wgpu::util::DeviceExt;

use crate::render::Light;

pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = LightUniform::default();
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    ambient: [f32; 4],
    // the fourth component is padding, uniforms require 16 byte spacing
    direction: [f32; 4],
    colour: [f32; 4],
}

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            ambient: [0.0; 4],
            direction: [0.0, 1.0, 0.0, 0.0],
            colour: [0.0; 4],
        }
    }
}

impl LightUniform {
    /// Sums all ambient lights and keeps the last directional light.
    /// A scene without lights renders its lit materials black.
    pub fn from_lights<'a>(lights: impl IntoIterator<Item = &'a Light>) -> Self {
        let mut uniform = Self::default();
        for light in lights {
            match light {
                Light::Ambient { colour, intensity } => {
                    for (acc, c) in uniform.ambient.iter_mut().zip(colour) {
                        *acc += c * intensity;
                    }
                }
                Light::Directional {
                    colour,
                    intensity,
                    position,
                } => {
                    let direction = if position.magnitude2() > 0.0 {
                        position.normalize()
                    } else {
                        cgmath::Vector3::unit_y()
                    };
                    uniform.direction = direction.extend(0.0).into();
                    uniform.colour = [colour[0] * intensity, colour[1] * intensity, colour[2] * intensity, 0.0];
                }
            }
        }
        uniform
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Uniform Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fold_ambient_and_directional_lights() {
        let lights = [
            Light::Ambient {
                colour: [1.0, 1.0, 1.0],
                intensity: 0.5,
            },
            Light::Directional {
                colour: [1.0, 1.0, 1.0],
                intensity: 0.5,
                position: cgmath::Vector3::new(0.0, 4.0, 0.0),
            },
        ];
        let uniform = LightUniform::from_lights(&lights);
        assert_eq!(uniform.ambient, [0.5, 0.5, 0.5, 0.0]);
        assert_eq!(uniform.direction, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(uniform.colour, [0.5, 0.5, 0.5, 0.0]);
    }
}
