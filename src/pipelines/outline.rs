use crate::pipelines::basic::{PipelineSpec, mk_render_pipeline};

/// Unlit line list for cell borders.
pub fn mk_outline_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    mk_render_pipeline(
        device,
        layout,
        shader,
        color_format,
        PipelineSpec {
            label: "Outline Pipeline",
            fragment_entry: "fs_flat",
            topology: wgpu::PrimitiveTopology::LineList,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            depth_write: true,
            cull_mode: None,
        },
    )
}
