use crate::assets::material::ShadingType;
use crate::assets::mesh::VertexAttribute;
use crate::errors::Result;
use crate::renderer::gpu::GpuDataInterface;
use crate::renderer::passes::{
    MeshDraw, PipelineDesc, VertexLayouts, camera_bind_group, collect_mesh_draws, create_pipeline,
    depth_state,
};
use crate::renderer::procedure::{RenderingData, RenderingStage, StageContext};
use crate::renderer::settings::RendererSettings;
use crate::resources::layouts::group;

const UNLIT_ATTRIBUTES: [VertexAttribute; 2] = [VertexAttribute::Position, VertexAttribute::TexCoord0];

/// Forward pass for Unlit primitives, straight into the render target.
///
/// Tests against the shared depth buffer but leaves it unchanged.
pub struct UnlitRenderer {
    pipeline: wgpu::RenderPipeline,
    camera: Option<wgpu::BindGroup>,
    draws: Vec<MeshDraw>,
}

impl UnlitRenderer {
    #[must_use]
    pub fn new(gpu: &GpuDataInterface, settings: &RendererSettings, target_format: wgpu::TextureFormat) -> Self {
        let shader = gpu.create_shader(
            "Unlit Shader",
            concat!(include_str!("../shaders/common.wgsl"), include_str!("../shaders/unlit.wgsl")),
        );
        let vertex = VertexLayouts::new(&UNLIT_ATTRIBUTES);
        let layouts = gpu.layouts();

        let pipeline = create_pipeline(
            gpu,
            &PipelineDesc {
                label: "Unlit Pipeline",
                shader: &shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                bind_groups: &[&layouts.camera, &layouts.transform, &layouts.unlit_material],
                vertex_buffers: &vertex.buffers(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                depth: Some(depth_state(settings.depth_format, false)),
                cull_mode: Some(wgpu::Face::Back),
            },
        );

        Self {
            pipeline,
            camera: None,
            draws: Vec::new(),
        }
    }
}

impl RenderingStage for UnlitRenderer {
    fn name(&self) -> &'static str {
        "Unlit Stage"
    }

    fn prepare(&mut self, ctx: &mut StageContext<'_>, data: &mut RenderingData) -> Result<()> {
        self.draws = collect_mesh_draws(ctx, Some(ShadingType::Unlit), &UNLIT_ATTRIBUTES, true)?;
        if !self.draws.is_empty() {
            self.camera = Some(camera_bind_group(ctx, data)?);
        }
        Ok(())
    }

    fn run(&self, data: &RenderingData, encoder: &mut wgpu::CommandEncoder) {
        let (Some(camera), Some(depth)) = (&self.camera, &data.depth) else {
            return;
        };
        if self.draws.is_empty() {
            return;
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Unlit Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &data.target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(group::CAMERA, camera, &[]);
        for draw in &self.draws {
            draw.record(&mut pass, group::TRANSFORM, Some(group::MATERIAL));
        }
    }
}
