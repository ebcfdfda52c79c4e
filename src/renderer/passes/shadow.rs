use crate::assets::mesh::VertexAttribute;
use crate::errors::Result;
use crate::renderer::gpu::GpuDataInterface;
use crate::renderer::passes::{
    MeshDraw, PipelineDesc, VertexLayouts, collect_mesh_draws, create_pipeline, depth_state,
};
use crate::renderer::procedure::{RenderingData, RenderingStage, StageContext};
use crate::resources::layouts::group;
use crate::scene::{ComponentType, LightComponent, ShadowMapComponent};

/// One shadow-casting sun and the depth target it renders into.
struct ShadowCaster {
    light: wgpu::BindGroup,
    depth: wgpu::TextureView,
}

/// Depth-only pass per shadow-casting sun light.
///
/// Only suns with `cast_shadow` and an attached [`ShadowMapComponent`] are
/// rendered; any other light is skipped.
pub struct ShadowMapper {
    pipeline: wgpu::RenderPipeline,
    casters: Vec<ShadowCaster>,
    draws: Vec<MeshDraw>,
}

impl ShadowMapper {
    #[must_use]
    pub fn new(gpu: &GpuDataInterface) -> Self {
        let shader = gpu.create_shader(
            "Shadow Shader",
            concat!(include_str!("../shaders/common.wgsl"), include_str!("../shaders/shadow.wgsl")),
        );
        let vertex = VertexLayouts::new(&[VertexAttribute::Position]);
        let layouts = gpu.layouts();

        let pipeline = create_pipeline(
            gpu,
            &PipelineDesc {
                label: "Shadow Pipeline",
                shader: &shader,
                vs_entry: "vs_main",
                fs_entry: None,
                bind_groups: &[&layouts.light, &layouts.transform],
                vertex_buffers: &vertex.buffers(),
                targets: &[],
                depth: Some(depth_state(wgpu::TextureFormat::Depth32Float, true)),
                cull_mode: None,
            },
        );

        Self {
            pipeline,
            casters: Vec::new(),
            draws: Vec::new(),
        }
    }
}

impl RenderingStage for ShadowMapper {
    fn name(&self) -> &'static str {
        "Shadow Stage"
    }

    fn prepare(&mut self, ctx: &mut StageContext<'_>, _data: &mut RenderingData) -> Result<()> {
        self.casters.clear();
        self.draws.clear();

        let records = ctx
            .scene
            .get_components(&*ctx.world, &[ComponentType::Light, ComponentType::ShadowMap]);

        for record in records {
            let (Some(light_key), Some(shadow_key)) = (record.components.light, record.components.shadow_map)
            else {
                continue;
            };

            let Some(light) = ctx.world.get_mut::<LightComponent>(light_key) else {
                continue;
            };
            if !light.casts_shadow() {
                log::debug!(
                    "Light '{}' does not cast shadows, shadow map left untouched",
                    ctx.world.entity_id(record.entity)
                );
                continue;
            }
            let light = light.ensure_bind_group(ctx.gpu)?.bind_group().clone();
            let Some(shadow_map) = ctx.world.get_mut::<ShadowMapComponent>(shadow_key) else {
                continue;
            };
            let Some(depth) = shadow_map.ensure_bind_group(ctx.gpu)?.depth_view().cloned() else {
                continue;
            };

            self.casters.push(ShadowCaster { light, depth });
        }

        if !self.casters.is_empty() {
            self.draws = collect_mesh_draws(ctx, None, &[VertexAttribute::Position], false)?;
        }
        Ok(())
    }

    fn run(&self, _data: &RenderingData, encoder: &mut wgpu::CommandEncoder) {
        for caster in &self.casters {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &caster.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(group::SHADOW_CASTER, &caster.light, &[]);
            for draw in &self.draws {
                draw.record(&mut pass, group::SHADOW_TRANSFORM, None);
            }
        }
    }
}
