//! Deferred PBR shading.
//!
//! Geometry pass: PBR primitives write surface attributes into four color
//! attachments plus depth. Lighting pass: full-screen triangles read those
//! attachments and accumulate ambient, point and sun contributions into the
//! render target with additive blending.

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
use crate::resources::bind_group::BindGroupData;
use crate::resources::layouts::group;
use crate::resources::uniforms::AmbientUniform;
use crate::scene::{ComponentType, LightComponent, LightKind, ShadowMapComponent};

pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const ORM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const EMISSION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

const GBUFFER_ATTRIBUTES: [VertexAttribute; 4] = [
    VertexAttribute::Position,
    VertexAttribute::Normal,
    VertexAttribute::Tangent,
    VertexAttribute::TexCoord0,
];

// ============================================================================
// G-buffer
// ============================================================================

/// Attachments of one render-target size. Replaced as a whole on resize.
struct GBuffer {
    width: u32,
    height: u32,
    textures: [wgpu::Texture; 5],
    views: [wgpu::TextureView; 5],
    bind_group: wgpu::BindGroup,
}

impl GBuffer {
    const NORMAL: usize = 0;
    const ALBEDO: usize = 1;
    const ORM: usize = 2;
    const EMISSION: usize = 3;
    const DEPTH: usize = 4;

    fn new(gpu: &GpuDataInterface, width: u32, height: u32, depth_format: wgpu::TextureFormat) -> Self {
        let attachments = [
            ("G-Buffer Normal", NORMAL_FORMAT),
            ("G-Buffer Albedo", ALBEDO_FORMAT),
            ("G-Buffer ORM", ORM_FORMAT),
            ("G-Buffer Emission", EMISSION_FORMAT),
            ("G-Buffer Depth", depth_format),
        ]
        .map(|(label, format)| gpu.create_attachment(label, width, height, format));

        let textures = attachments.clone().map(|(texture, _)| texture);
        let views = attachments.map(|(_, view)| view);

        let entries: Vec<wgpu::BindGroupEntry<'_>> = views
            .iter()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        let bind_group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("G-Buffer BindGroup"),
            layout: &gpu.layouts().gbuffer,
            entries: &entries,
        });

        Self {
            width,
            height,
            textures,
            views,
            bind_group,
        }
    }

    fn color_attachment(&self, index: usize) -> Option<wgpu::RenderPassColorAttachment<'_>> {
        Some(wgpu::RenderPassColorAttachment {
            view: &self.views[index],
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })
    }
}

impl Drop for GBuffer {
    fn drop(&mut self) {
        for texture in &self.textures {
            texture.destroy();
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

enum LightDraw {
    Point(wgpu::BindGroup),
    Sun {
        light: wgpu::BindGroup,
        shadow: wgpu::BindGroup,
    },
}

pub struct DeferredPbrRenderer {
    geometry_pipeline: wgpu::RenderPipeline,
    ambient_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,
    sun_pipeline: wgpu::RenderPipeline,

    depth_format: wgpu::TextureFormat,
    gbuffer: Option<GBuffer>,
    ambient: BindGroupData,
    /// Bound for suns without a rendered shadow map. Cleared to 1.0 (fully lit).
    dummy_shadow: BindGroupData,

    clear_color: wgpu::Color,
    camera: Option<wgpu::BindGroup>,
    draws: Vec<MeshDraw>,
    lights: Vec<LightDraw>,
}

impl DeferredPbrRenderer {
    #[must_use]
    pub fn new(gpu: &GpuDataInterface, settings: &RendererSettings, target_format: wgpu::TextureFormat) -> Self {
        let layouts = gpu.layouts();

        let geometry_shader = gpu.create_shader(
            "G-Buffer Shader",
            concat!(include_str!("../shaders/common.wgsl"), include_str!("../shaders/gbuffer.wgsl")),
        );
        let ambient_shader = gpu.create_shader(
            "Ambient Lighting Shader",
            concat!(
                include_str!("../shaders/common.wgsl"),
                include_str!("../shaders/lighting_common.wgsl"),
                include_str!("../shaders/ambient.wgsl")
            ),
        );
        let direct_shader = gpu.create_shader(
            "Direct Lighting Shader",
            concat!(
                include_str!("../shaders/common.wgsl"),
                include_str!("../shaders/lighting_common.wgsl"),
                include_str!("../shaders/direct.wgsl")
            ),
        );

        let vertex = VertexLayouts::new(&GBUFFER_ATTRIBUTES);
        let gbuffer_targets = [NORMAL_FORMAT, ALBEDO_FORMAT, ORM_FORMAT, EMISSION_FORMAT].map(|format| {
            Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })
        });

        let geometry_pipeline = create_pipeline(
            gpu,
            &PipelineDesc {
                label: "G-Buffer Pipeline",
                shader: &geometry_shader,
                vs_entry: "vs_main",
                fs_entry: Some("fs_main"),
                bind_groups: &[&layouts.camera, &layouts.transform, &layouts.pbr_material],
                vertex_buffers: &vertex.buffers(),
                targets: &gbuffer_targets,
                depth: Some(depth_state(settings.depth_format, true)),
                cull_mode: Some(wgpu::Face::Back),
            },
        );

        let additive = [Some(wgpu::ColorTargetState {
            format: target_format,
            blend: Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent::REPLACE,
            }),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let ambient_pipeline = lighting_pipeline(
            gpu,
            &additive,
            "Ambient Lighting Pipeline",
            &ambient_shader,
            "fs_ambient",
            &[&layouts.camera, &layouts.gbuffer, &layouts.ambient],
        );
        let point_pipeline = lighting_pipeline(
            gpu,
            &additive,
            "Point Lighting Pipeline",
            &direct_shader,
            "fs_point",
            &[&layouts.camera, &layouts.gbuffer, &layouts.light],
        );
        let sun_pipeline = lighting_pipeline(
            gpu,
            &additive,
            "Sun Lighting Pipeline",
            &direct_shader,
            "fs_sun",
            &[&layouts.camera, &layouts.gbuffer, &layouts.light, &layouts.shadow_map],
        );

        let ambient = BindGroupData::uniform(
            gpu,
            &layouts.ambient,
            "Ambient",
            &AmbientUniform {
                color: settings.ambient_color,
                intensity: settings.ambient_intensity,
            },
        );
        let dummy_shadow = BindGroupData::shadow_depth(gpu, &layouts.shadow_map, "Dummy Shadow Map", 1);
        clear_depth(gpu, &dummy_shadow);

        Self {
            geometry_pipeline,
            ambient_pipeline,
            point_pipeline,
            sun_pipeline,
            depth_format: settings.depth_format,
            gbuffer: None,
            ambient,
            dummy_shadow,
            clear_color: settings.clear_color,
            camera: None,
            draws: Vec::new(),
            lights: Vec::new(),
        }
    }

    fn ensure_gbuffer(&mut self, gpu: &GpuDataInterface, width: u32, height: u32) -> &GBuffer {
        let stale = self
            .gbuffer
            .as_ref()
            .is_some_and(|g| g.width != width || g.height != height);
        if stale {
            // Old attachments are destroyed before the new ones are allocated.
            self.gbuffer = None;
        }
        let depth_format = self.depth_format;
        self.gbuffer
            .get_or_insert_with(|| GBuffer::new(gpu, width, height, depth_format))
    }

    fn collect_lights(&mut self, ctx: &mut StageContext<'_>) -> Result<()> {
        self.lights.clear();
        let records = ctx
            .scene
            .get_components(&*ctx.world, &[ComponentType::Transform, ComponentType::Light]);

        for record in records {
            let Some(light_key) = record.components.light else {
                continue;
            };

            let shadow = ctx
                .world
                .get_component_or_none::<ShadowMapComponent>(record.entity)
                .and_then(ShadowMapComponent::bind_group)
                .map(|data| data.bind_group().clone());

            let Some(light) = ctx.world.get_mut::<LightComponent>(light_key) else {
                continue;
            };
            let casts_shadow = light.casts_shadow();
            let kind = light.kind();
            let bind_group = light.ensure_bind_group(ctx.gpu)?.bind_group().clone();

            self.lights.push(match kind {
                LightKind::Point => LightDraw::Point(bind_group),
                LightKind::Sun => LightDraw::Sun {
                    light: bind_group,
                    shadow: shadow
                        .filter(|_| casts_shadow)
                        .unwrap_or_else(|| self.dummy_shadow.bind_group().clone()),
                },
            });
        }
        Ok(())
    }
}

fn lighting_pipeline(
    gpu: &GpuDataInterface,
    targets: &[Option<wgpu::ColorTargetState>],
    label: &str,
    shader: &wgpu::ShaderModule,
    fs_entry: &str,
    bind_groups: &[&wgpu::BindGroupLayout],
) -> wgpu::RenderPipeline {
    create_pipeline(
        gpu,
        &PipelineDesc {
            label,
            shader,
            vs_entry: "vs_fullscreen",
            fs_entry: Some(fs_entry),
            bind_groups,
            vertex_buffers: &[],
            targets,
            depth: None,
            cull_mode: None,
        },
    )
}

/// Clears a freshly created depth target to the far plane.
fn clear_depth(gpu: &GpuDataInterface, data: &BindGroupData) {
    let Some(view) = data.depth_view() else {
        return;
    };
    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Depth Clear Encoder"),
        });
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Depth Clear Pass"),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view,
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
    gpu.queue().submit(std::iter::once(encoder.finish()));
}

impl RenderingStage for DeferredPbrRenderer {
    fn name(&self) -> &'static str {
        "Deferred PBR Stage"
    }

    fn prepare(&mut self, ctx: &mut StageContext<'_>, data: &mut RenderingData) -> Result<()> {
        self.camera = Some(camera_bind_group(ctx, data)?);
        self.clear_color = ctx.settings.clear_color;
        self.ambient.write(
            ctx.gpu,
            &AmbientUniform {
                color: ctx.settings.ambient_color,
                intensity: ctx.settings.ambient_intensity,
            },
        );

        self.draws = collect_mesh_draws(ctx, Some(ShadingType::Pbr), &GBUFFER_ATTRIBUTES, true)?;
        self.collect_lights(ctx)?;

        let depth = self.ensure_gbuffer(ctx.gpu, data.width, data.height).views[GBuffer::DEPTH].clone();
        data.depth = Some(depth);
        Ok(())
    }

    fn run(&self, data: &RenderingData, encoder: &mut wgpu::CommandEncoder) {
        let (Some(gbuffer), Some(camera)) = (&self.gbuffer, &self.camera) else {
            return;
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("G-Buffer Pass"),
                color_attachments: &[
                    gbuffer.color_attachment(GBuffer::NORMAL),
                    gbuffer.color_attachment(GBuffer::ALBEDO),
                    gbuffer.color_attachment(GBuffer::ORM),
                    gbuffer.color_attachment(GBuffer::EMISSION),
                ],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gbuffer.views[GBuffer::DEPTH],
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

            pass.set_pipeline(&self.geometry_pipeline);
            pass.set_bind_group(group::CAMERA, camera, &[]);
            for draw in &self.draws {
                draw.record(&mut pass, group::TRANSFORM, Some(group::MATERIAL));
            }
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lighting Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &data.target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_bind_group(group::CAMERA, camera, &[]);
        pass.set_bind_group(group::GBUFFER, &gbuffer.bind_group, &[]);

        pass.set_pipeline(&self.ambient_pipeline);
        pass.set_bind_group(group::LIGHT, self.ambient.bind_group(), &[]);
        pass.draw(0..3, 0..1);

        for light in &self.lights {
            match light {
                LightDraw::Point(bind_group) => {
                    pass.set_pipeline(&self.point_pipeline);
                    pass.set_bind_group(group::LIGHT, bind_group, &[]);
                }
                LightDraw::Sun { light, shadow } => {
                    pass.set_pipeline(&self.sun_pipeline);
                    pass.set_bind_group(group::LIGHT, light, &[]);
                    pass.set_bind_group(group::SHADOW_MAP, shadow, &[]);
                }
            }
            pass.draw(0..3, 0..1);
        }
    }
}
