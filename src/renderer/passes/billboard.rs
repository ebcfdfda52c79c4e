use crate::errors::Result;
use crate::renderer::gpu::GpuDataInterface;
use crate::renderer::passes::{PipelineDesc, camera_bind_group, create_pipeline, depth_state};
use crate::renderer::procedure::{RenderingData, RenderingStage, StageContext};
use crate::renderer::settings::RendererSettings;
use crate::resources::layouts::group;
use crate::scene::{BillboardComponent, ComponentType, TransformComponent};

struct BillboardDraw {
    transform: wgpu::BindGroup,
    texture: wgpu::BindGroup,
}

/// Camera-facing textured quads drawn over the lit image.
///
/// Depth-tested against the G-buffer depth without writing it, so markers
/// are hidden by geometry in front of them but never hide each other.
pub struct BillboardRenderer {
    pipeline: wgpu::RenderPipeline,
    camera: Option<wgpu::BindGroup>,
    draws: Vec<BillboardDraw>,
}

impl BillboardRenderer {
    #[must_use]
    pub fn new(gpu: &GpuDataInterface, settings: &RendererSettings, target_format: wgpu::TextureFormat) -> Self {
        let shader = gpu.create_shader(
            "Billboard Shader",
            concat!(include_str!("../shaders/common.wgsl"), include_str!("../shaders/billboard.wgsl")),
        );
        let layouts = gpu.layouts();

        let pipeline = create_pipeline(
            gpu,
            &PipelineDesc {
                label: "Billboard Pipeline",
                shader: &shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                bind_groups: &[&layouts.camera, &layouts.transform, &layouts.texture],
                vertex_buffers: &[],
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                depth: Some(depth_state(settings.depth_format, false)),
                cull_mode: None,
            },
        );

        Self {
            pipeline,
            camera: None,
            draws: Vec::new(),
        }
    }
}

impl RenderingStage for BillboardRenderer {
    fn name(&self) -> &'static str {
        "Billboard Stage"
    }

    fn prepare(&mut self, ctx: &mut StageContext<'_>, data: &mut RenderingData) -> Result<()> {
        self.draws.clear();
        let records = ctx
            .scene
            .get_components(&*ctx.world, &[ComponentType::Transform, ComponentType::Billboard]);
        if records.is_empty() {
            return Ok(());
        }
        self.camera = Some(camera_bind_group(ctx, data)?);

        for record in records {
            let (Some(transform_key), Some(billboard_key)) =
                (record.components.transform, record.components.billboard)
            else {
                continue;
            };

            let Some(transform) = ctx.world.get_mut::<TransformComponent>(transform_key) else {
                continue;
            };
            let transform = transform.ensure_bind_group(ctx.gpu)?.bind_group().clone();

            let Some(billboard) = ctx.world.get_mut::<BillboardComponent>(billboard_key) else {
                continue;
            };
            let texture = match billboard.ensure_bind_group(ctx.gpu) {
                Ok(data) => data.bind_group().clone(),
                Err(e) => {
                    log::warn!("Skipping billboard with texture '{}': {e}", billboard.texture().id());
                    continue;
                }
            };

            self.draws.push(BillboardDraw { transform, texture });
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
            label: Some("Billboard Pass"),
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
            pass.set_bind_group(group::TRANSFORM, &draw.transform, &[]);
            pass.set_bind_group(group::MATERIAL, &draw.texture, &[]);
            pass.draw(0..6, 0..1);
        }
    }
}
