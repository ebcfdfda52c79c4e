//! Bind group layout registry.
//!
//! All bind group layouts used by components, assets and rendering stages are
//! created once per device here and handed out by reference. Nothing is
//! memoized in statics, so two devices never share layout objects.

use wgpu::ShaderStages;

/// Group index conventions shared by every pipeline.
pub mod group {
    // Geometry, billboard and unlit pipelines.
    pub const CAMERA: u32 = 0;
    pub const TRANSFORM: u32 = 1;
    pub const MATERIAL: u32 = 2;

    // Lighting pipelines (camera stays at 0).
    pub const GBUFFER: u32 = 1;
    pub const LIGHT: u32 = 2;
    pub const SHADOW_MAP: u32 = 3;

    // Shadow depth pipeline.
    pub const SHADOW_CASTER: u32 = 0;
    pub const SHADOW_TRANSFORM: u32 = 1;
}

pub(crate) fn uniform_entry(binding: u32, visibility: ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn filterable_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(binding, wgpu::TextureSampleType::Float { filterable: true })
}

fn sampler_entry(binding: u32, ty: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

/// Owner of every bind group layout in the engine.
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    pub camera: wgpu::BindGroupLayout,
    pub transform: wgpu::BindGroupLayout,
    pub light: wgpu::BindGroupLayout,
    /// Depth texture + comparison sampler.
    pub shadow_map: wgpu::BindGroupLayout,
    /// Color texture + filtering sampler (billboards).
    pub texture: wgpu::BindGroupLayout,
    pub pbr_material: wgpu::BindGroupLayout,
    pub unlit_material: wgpu::BindGroupLayout,
    /// Normal, albedo, ORM, emission and depth of the G-buffer.
    pub gbuffer: wgpu::BindGroupLayout,
    pub ambient: wgpu::BindGroupLayout,
}

impl LayoutRegistry {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let vf = ShaderStages::VERTEX | ShaderStages::FRAGMENT;

        let single_uniform = |label: &str| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[uniform_entry(0, vf)],
            })
        };

        let camera = single_uniform("Camera BindGroup Layout");
        let transform = single_uniform("Transform BindGroup Layout");
        let light = single_uniform("Light BindGroup Layout");

        let shadow_map = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Map BindGroup Layout"),
            entries: &[
                texture_entry(0, wgpu::TextureSampleType::Depth),
                sampler_entry(1, wgpu::SamplerBindingType::Comparison),
            ],
        });

        let texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture BindGroup Layout"),
            entries: &[
                filterable_texture_entry(0),
                sampler_entry(1, wgpu::SamplerBindingType::Filtering),
            ],
        });

        let pbr_material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PBR Material BindGroup Layout"),
            entries: &[
                uniform_entry(0, ShaderStages::FRAGMENT),
                filterable_texture_entry(1), // albedo
                filterable_texture_entry(2), // normal
                filterable_texture_entry(3), // occlusion-roughness-metallic
                filterable_texture_entry(4), // emission
                sampler_entry(5, wgpu::SamplerBindingType::Filtering),
            ],
        });

        let unlit_material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Unlit Material BindGroup Layout"),
            entries: &[
                uniform_entry(0, ShaderStages::FRAGMENT),
                filterable_texture_entry(1),
                sampler_entry(2, wgpu::SamplerBindingType::Filtering),
            ],
        });

        // G-buffer attachments are read with `textureLoad`, so none of them
        // needs a sampler.
        let unfiltered = wgpu::TextureSampleType::Float { filterable: false };
        let gbuffer = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("G-Buffer BindGroup Layout"),
            entries: &[
                texture_entry(0, unfiltered),
                texture_entry(1, unfiltered),
                texture_entry(2, unfiltered),
                texture_entry(3, unfiltered),
                texture_entry(4, wgpu::TextureSampleType::Depth),
            ],
        });

        let ambient = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Ambient BindGroup Layout"),
            entries: &[uniform_entry(0, ShaderStages::FRAGMENT)],
        });

        Self {
            camera,
            transform,
            light,
            shadow_map,
            texture,
            pbr_material,
            unlit_material,
            gbuffer,
            ambient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::group;

    fn distinct_and_bounded(groups: &[u32]) -> bool {
        let max = wgpu::Limits::downlevel_defaults().max_bind_groups;
        groups.iter().all(|&g| g < max)
            && groups.iter().enumerate().all(|(i, g)| !groups[..i].contains(g))
    }

    #[test]
    fn each_pipeline_uses_distinct_groups() {
        assert!(distinct_and_bounded(&[group::CAMERA, group::TRANSFORM, group::MATERIAL]));
        assert!(distinct_and_bounded(&[
            group::CAMERA,
            group::GBUFFER,
            group::LIGHT,
            group::SHADOW_MAP
        ]));
        assert!(distinct_and_bounded(&[group::SHADOW_CASTER, group::SHADOW_TRANSFORM]));
    }
}
