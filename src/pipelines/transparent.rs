use crate::pipelines::basic::{PipelineSpec, mk_render_pipeline};

/**
 * Alpha-blended pipeline for the highlighted special cells.
 *
 * Depth is tested but not written so the translucent slabs never hide the
 * outlines or the token standing behind them.
 */
pub fn mk_transparent_pipeline(
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
            label: "Translucent Pipeline",
            fragment_entry: "fs_lit",
            topology: wgpu::PrimitiveTopology::TriangleList,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            depth_write: false,
            cull_mode: Some(wgpu::Face::Back),
        },
    )
}
