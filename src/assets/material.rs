use glam::{Vec3, Vec4};
use smallvec::SmallVec;

use crate::assets::loader::{AssetHandle, AssetSource, SharedLoader};
use crate::assets::texture::TextureSource;
use crate::errors::Result;
use crate::renderer::gpu::GpuDataInterface;
use crate::resources::bind_group::{BindGroupData, BindGroupResource};
use crate::resources::uniforms::{PbrMaterialUniform, UnlitMaterialUniform};

/// Which rendering stage draws a primitive using this material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingType {
    /// Deferred: G-buffer + lighting.
    Pbr,
    /// Forward, after lighting, without light contribution.
    Unlit,
}

/// Metallic-roughness material. Texture fields are asset ids.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterialProps {
    pub albedo_factor: Vec4,
    pub albedo_texture: Option<String>,
    pub normal_texture: Option<String>,
    pub normal_scale: f32,
    /// Occlusion in R, roughness in G, metallic in B.
    pub orm_texture: Option<String>,
    pub occlusion_strength: f32,
    pub roughness_factor: f32,
    pub metallic_factor: f32,
    pub emission_texture: Option<String>,
    pub emission_factor: Vec3,
}

impl Default for PbrMaterialProps {
    fn default() -> Self {
        Self {
            albedo_factor: Vec4::ONE,
            albedo_texture: None,
            normal_texture: None,
            normal_scale: 1.0,
            orm_texture: None,
            occlusion_strength: 1.0,
            roughness_factor: 0.5,
            metallic_factor: 0.0,
            emission_texture: None,
            emission_factor: Vec3::ZERO,
        }
    }
}

impl PbrMaterialProps {
    #[must_use]
    pub fn uniform(&self) -> PbrMaterialUniform {
        PbrMaterialUniform {
            albedo_factor: self.albedo_factor,
            emission_factor: self.emission_factor,
            metallic_factor: self.metallic_factor,
            roughness_factor: self.roughness_factor,
            occlusion_strength: self.occlusion_strength,
            normal_scale: self.normal_scale,
            _padding: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnlitMaterialProps {
    pub color_factor: Vec4,
    pub color_texture: Option<String>,
}

impl Default for UnlitMaterialProps {
    fn default() -> Self {
        Self {
            color_factor: Vec4::ONE,
            color_texture: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialProps {
    Pbr(PbrMaterialProps),
    Unlit(UnlitMaterialProps),
}

impl MaterialProps {
    #[must_use]
    pub fn shading_type(&self) -> ShadingType {
        match self {
            Self::Pbr(_) => ShadingType::Pbr,
            Self::Unlit(_) => ShadingType::Unlit,
        }
    }

    /// Texture ids in binding order, with the built-in substitute for each
    /// empty slot.
    #[must_use]
    pub fn texture_slots(&self) -> SmallVec<[String; 4]> {
        let or = |id: &Option<String>, fallback: &str| id.clone().unwrap_or_else(|| fallback.to_string());
        match self {
            Self::Pbr(p) => SmallVec::from_vec(vec![
                or(&p.albedo_texture, "white"),
                or(&p.normal_texture, "normal"),
                or(&p.orm_texture, "white"),
                or(&p.emission_texture, "white"),
            ]),
            Self::Unlit(u) => SmallVec::from_vec(vec![or(&u.color_texture, "white")]),
        }
    }
}

/// Material with its textures resolved to shared loaders.
pub struct MaterialSource {
    props: MaterialProps,
    textures: SmallVec<[SharedLoader<TextureSource>; 4]>,
}

impl MaterialSource {
    /// `textures` must follow [`MaterialProps::texture_slots`] order.
    #[must_use]
    pub fn new(props: MaterialProps, textures: SmallVec<[SharedLoader<TextureSource>; 4]>) -> Self {
        Self { props, textures }
    }

    #[inline]
    #[must_use]
    pub fn props(&self) -> &MaterialProps {
        &self.props
    }

    #[must_use]
    pub fn shading_type(&self) -> ShadingType {
        self.props.shading_type()
    }

    /// Ids of the resolved textures, in binding order.
    #[must_use]
    pub fn texture_ids(&self) -> Vec<String> {
        self.textures.iter().map(|t| t.borrow().id().to_string()).collect()
    }
}

/// Loaded material: its bind group and the texture handles it samples from.
///
/// Field order matters: the bind group is dropped before the textures it
/// references are released.
pub struct GpuMaterial {
    pub shading: ShadingType,
    pub bind_group: BindGroupData,
    _textures: SmallVec<[AssetHandle<TextureSource>; 4]>,
}

impl AssetSource for MaterialSource {
    type Context = GpuDataInterface;
    type Payload = GpuMaterial;

    fn load(&self, gpu: &GpuDataInterface) -> Result<GpuMaterial> {
        let mut handles: SmallVec<[AssetHandle<TextureSource>; 4]> = SmallVec::new();
        let mut views = Vec::with_capacity(self.textures.len());
        for loader in &self.textures {
            let handle = AssetHandle::new(loader.clone());
            views.push(handle.get(gpu)?.view.clone());
            handles.push(handle);
        }

        let sampler = gpu.create_linear_sampler("Material Sampler");
        let (layout, buffer) = match &self.props {
            MaterialProps::Pbr(p) => (
                &gpu.layouts().pbr_material,
                gpu.create_uniform_buffer("PBR Material Uniforms", &p.uniform()),
            ),
            MaterialProps::Unlit(u) => (
                &gpu.layouts().unlit_material,
                gpu.create_uniform_buffer(
                    "Unlit Material Uniforms",
                    &UnlitMaterialUniform {
                        color_factor: u.color_factor,
                    },
                ),
            ),
        };

        let bind_group = {
            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }];
            for (i, view) in views.iter().enumerate() {
                entries.push(wgpu::BindGroupEntry {
                    binding: i as u32 + 1,
                    resource: wgpu::BindingResource::TextureView(view),
                });
            }
            entries.push(wgpu::BindGroupEntry {
                binding: views.len() as u32 + 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            });

            gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material BindGroup"),
                layout,
                entries: &entries,
            })
        };

        Ok(GpuMaterial {
            shading: self.shading_type(),
            bind_group: BindGroupData::from_parts(
                bind_group,
                BindGroupResource::Material { buffer, sampler },
            ),
            _textures: handles,
        })
    }
}
