//! Render pipelines for the board.
//!
//! All pipelines share one shader, one vertex layout (mesh vertex + instance)
//! and one pipeline layout (camera at group 0, light at group 1). They differ
//! in topology, blending and depth writes only.

pub mod basic;
pub mod light;
pub mod outline;
pub mod transparent;

use crate::render::Surface;

pub struct Pipelines {
    pub opaque: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
    pub translucent: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Board Pipeline Layout"),
            bind_group_layouts: &[camera_bind_group_layout, light_bind_group_layout],
            push_constant_ranges: &[],
        });
        let shader = basic::mk_shader(device);
        Self {
            opaque: basic::mk_opaque_pipeline(device, &layout, &shader, config.format),
            lines: outline::mk_outline_pipeline(device, &layout, &shader, config.format),
            translucent: transparent::mk_transparent_pipeline(device, &layout, &shader, config.format),
        }
    }

    pub fn for_surface(&self, surface: Surface) -> &wgpu::RenderPipeline {
        match surface {
            Surface::Opaque => &self.opaque,
            Surface::Lines => &self.lines,
            Surface::Translucent => &self.translucent,
        }
    }
}
