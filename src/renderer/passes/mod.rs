//! Rendering stages of the deferred procedure.
//!
//! | Stage                   | Reads                         | Writes                      |
//! |-------------------------|-------------------------------|-----------------------------|
//! | [`ShadowMapper`]        | lights, shadow maps, meshes   | shadow depth targets        |
//! | [`DeferredPbrRenderer`] | PBR meshes, lights, G-buffer  | G-buffer, depth, target     |
//! | [`BillboardRenderer`]   | billboards, depth             | target                      |
//! | [`UnlitRenderer`]       | unlit meshes, depth           | target                      |
//!
//! Every stage gathers its draw list in `prepare` (where bind groups are
//! created on demand) and records GPU commands from that list in `run`.

pub mod billboard;
pub mod deferred;
pub mod shadow;
pub mod unlit;

pub use billboard::BillboardRenderer;
pub use deferred::DeferredPbrRenderer;
pub use shadow::ShadowMapper;
pub use unlit::UnlitRenderer;

use smallvec::SmallVec;

use crate::assets::material::ShadingType;
use crate::assets::mesh::VertexAttribute;
use crate::errors::Result;
use crate::renderer::gpu::GpuDataInterface;
use crate::renderer::procedure::{RenderingData, StageContext};
use crate::scene::{CameraComponent, ComponentType, MeshRendererComponent, TransformComponent};

/// Everything needed to record one primitive draw.
pub struct MeshDraw {
    pub transform: wgpu::BindGroup,
    pub material: Option<wgpu::BindGroup>,
    /// One buffer per requested attribute, in slot order.
    pub vertex_buffers: SmallVec<[(wgpu::Buffer, u64); 4]>,
    pub index: Option<(wgpu::Buffer, u64, wgpu::IndexFormat, u32)>,
    pub vertex_count: u32,
}

impl MeshDraw {
    /// Binds the transform (and material, when both are present) and issues the draw.
    pub fn record(&self, pass: &mut wgpu::RenderPass<'_>, transform_group: u32, material_group: Option<u32>) {
        pass.set_bind_group(transform_group, &self.transform, &[]);
        if let (Some(group), Some(material)) = (material_group, &self.material) {
            pass.set_bind_group(group, material, &[]);
        }

        for (slot, (buffer, offset)) in self.vertex_buffers.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
        }

        match &self.index {
            Some((buffer, offset, format, count)) => {
                pass.set_index_buffer(buffer.slice(*offset..), *format);
                pass.draw_indexed(0..*count, 0, 0..1);
            }
            None => pass.draw(0..self.vertex_count, 0..1),
        }
    }
}

/// Gathers draws for every Transform + MeshRenderer entity of the scene.
///
/// `shading` filters primitives by their material's shading type (`None`
/// keeps all). Primitives whose mesh lacks one of `attributes`, or whose
/// assets fail to load, are skipped with a log line.
pub fn collect_mesh_draws(
    ctx: &mut StageContext<'_>,
    shading: Option<ShadingType>,
    attributes: &[VertexAttribute],
    with_material: bool,
) -> Result<Vec<MeshDraw>> {
    let mut draws = Vec::new();

    for record in ctx
        .scene
        .get_components(ctx.world, &[ComponentType::Transform, ComponentType::MeshRenderer])
    {
        let (Some(transform_key), Some(renderer_key)) =
            (record.components.transform, record.components.mesh_renderer)
        else {
            continue;
        };

        let transform = match ctx.world.get_mut::<TransformComponent>(transform_key) {
            Some(transform) => transform.ensure_bind_group(ctx.gpu)?.bind_group().clone(),
            None => continue,
        };
        let Some(renderer) = ctx.world.get::<MeshRendererComponent>(renderer_key) else {
            continue;
        };

        for primitive in &renderer.primitives {
            if shading.is_some_and(|s| primitive.shading_type() != s) {
                continue;
            }

            let mesh = match primitive.mesh.get(ctx.gpu) {
                Ok(mesh) => mesh,
                Err(e) => {
                    log::warn!("Skipping primitive of mesh '{}': {e}", primitive.mesh.id());
                    continue;
                }
            };

            let mut vertex_buffers = SmallVec::new();
            for attribute in attributes {
                match mesh.vertex_buffer(*attribute) {
                    Some(binding) => vertex_buffers.push((binding.buffer.clone(), binding.byte_offset)),
                    None => break,
                }
            }
            if vertex_buffers.len() != attributes.len() {
                log::debug!(
                    "Mesh '{}' lacks an attribute required by this stage, skipped",
                    primitive.mesh.id()
                );
                continue;
            }

            let material = if with_material {
                match primitive.material.get(ctx.gpu) {
                    Ok(material) => Some(material.bind_group.bind_group().clone()),
                    Err(e) => {
                        log::warn!("Skipping primitive with material '{}': {e}", primitive.material.id());
                        continue;
                    }
                }
            } else {
                None
            };

            draws.push(MeshDraw {
                transform: transform.clone(),
                material,
                vertex_buffers,
                index: mesh
                    .index
                    .as_ref()
                    .map(|(binding, format, count)| (binding.buffer.clone(), binding.byte_offset, *format, *count)),
                vertex_count: mesh.vertex_count,
            });
        }
    }

    Ok(draws)
}

/// Camera bind group of the frame's active camera.
pub fn camera_bind_group(ctx: &mut StageContext<'_>, data: &RenderingData) -> Result<wgpu::BindGroup> {
    let camera = ctx.world.get_component_mut::<CameraComponent>(data.camera)?;
    Ok(camera.ensure_bind_group(ctx.gpu)?.bind_group().clone())
}

/// One vertex buffer per attribute, tightly packed, locations in slice order.
pub(crate) struct VertexLayouts {
    attributes: Vec<[wgpu::VertexAttribute; 1]>,
    strides: Vec<u64>,
}

impl VertexLayouts {
    pub(crate) fn new(attributes: &[VertexAttribute]) -> Self {
        Self {
            attributes: attributes
                .iter()
                .enumerate()
                .map(|(location, attribute)| {
                    [wgpu::VertexAttribute {
                        format: attribute.format(),
                        offset: 0,
                        shader_location: location as u32,
                    }]
                })
                .collect(),
            strides: attributes.iter().map(|a| a.stride()).collect(),
        }
    }

    pub(crate) fn buffers(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.attributes
            .iter()
            .zip(&self.strides)
            .map(|(attributes, stride)| wgpu::VertexBufferLayout {
                array_stride: *stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect()
    }
}

/// Parameters of one render pipeline built by [`create_pipeline`].
pub(crate) struct PipelineDesc<'a> {
    pub label: &'a str,
    pub shader: &'a wgpu::ShaderModule,
    pub vs_entry: &'a str,
    pub fs_entry: Option<&'a str>,
    pub bind_groups: &'a [&'a wgpu::BindGroupLayout],
    pub vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    pub targets: &'a [Option<wgpu::ColorTargetState>],
    pub depth: Option<wgpu::DepthStencilState>,
    pub cull_mode: Option<wgpu::Face>,
}

pub(crate) fn create_pipeline(gpu: &GpuDataInterface, desc: &PipelineDesc<'_>) -> wgpu::RenderPipeline {
    let device = gpu.device();
    let bind_group_layouts: Vec<Option<&wgpu::BindGroupLayout>> =
        desc.bind_groups.iter().copied().map(Some).collect();
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{} Layout", desc.label)),
        bind_group_layouts: &bind_group_layouts,
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: desc.shader,
            entry_point: Some(desc.vs_entry),
            buffers: desc.vertex_buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: desc.fs_entry.map(|entry| wgpu::FragmentState {
            module: desc.shader,
            entry_point: Some(entry),
            targets: desc.targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            ..Default::default()
        },
        depth_stencil: desc.depth.clone(),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Depth state for a pass that tests with `Less` against `format`.
pub(crate) fn depth_state(format: wgpu::TextureFormat, write: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: Some(write),
        depth_compare: Some(wgpu::CompareFunction::Less),
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}
