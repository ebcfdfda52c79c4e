//! Owned GPU resource groups.
//!
//! A [`BindGroupData`] is the unit components and materials hold in a
//! [`GpuSlot`](super::slot::GpuSlot): one `wgpu::BindGroup` plus the buffers
//! and textures it exclusively owns. Owned resources are destroyed when the
//! value is dropped, which happens exactly once, when its slot unloads.
//!
//! Resizing never mutates a group in place: the owner unloads the slot and
//! the next `ensure_loaded` builds a fresh group with a new [`ResourceId`].

use bytemuck::Pod;

use crate::renderer::gpu::GpuDataInterface;
use crate::resources::slot::ResourceId;

/// Resources owned by (or referenced from) one bind group.
#[derive(Debug)]
pub enum BindGroupResource {
    /// A single uniform buffer at binding 0.
    Uniform(wgpu::Buffer),
    /// A texture view owned by an asset loader plus a sampler owned here.
    Texture {
        view: wgpu::TextureView,
        sampler: wgpu::Sampler,
    },
    /// Material: uniform buffer owned here, texture views owned by asset loaders.
    Material {
        buffer: wgpu::Buffer,
        sampler: wgpu::Sampler,
    },
    /// Shadow depth target rendered to by the shadow stage and sampled with a
    /// comparison sampler by the lighting stage.
    ShadowDepth {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        sampler: wgpu::Sampler,
        size: u32,
    },
}

#[derive(Debug)]
pub struct BindGroupData {
    id: ResourceId,
    bind_group: wgpu::BindGroup,
    resource: BindGroupResource,
}

impl BindGroupData {
    /// Wraps an already-built bind group and the resources it owns.
    #[must_use]
    pub fn from_parts(bind_group: wgpu::BindGroup, resource: BindGroupResource) -> Self {
        Self {
            id: ResourceId::next(),
            bind_group,
            resource,
        }
    }

    /// Uniform buffer group initialised with `initial`.
    #[must_use]
    pub fn uniform<T: Pod>(
        gpu: &GpuDataInterface,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        initial: &T,
    ) -> Self {
        let buffer = gpu.create_uniform_buffer(&format!("{label} Uniforms"), initial);
        let bind_group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} BindGroup")),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self::from_parts(bind_group, BindGroupResource::Uniform(buffer))
    }

    /// Color texture + filtering sampler group. The view is borrowed from a
    /// texture asset; only the sampler belongs to this group.
    #[must_use]
    pub fn texture(
        gpu: &GpuDataInterface,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        view: &wgpu::TextureView,
    ) -> Self {
        let sampler = gpu.create_linear_sampler(label);
        let bind_group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} BindGroup")),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        Self::from_parts(
            bind_group,
            BindGroupResource::Texture {
                view: view.clone(),
                sampler,
            },
        )
    }

    /// Square depth target of `size × size` texels for shadow mapping.
    #[must_use]
    pub fn shadow_depth(
        gpu: &GpuDataInterface,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        size: u32,
    ) -> Self {
        let size = size.max(1);
        let (texture, view) = gpu.create_attachment(
            &format!("{label} Depth"),
            size,
            size,
            wgpu::TextureFormat::Depth32Float,
        );
        let sampler = gpu.create_comparison_sampler(label);
        let bind_group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} BindGroup")),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        Self::from_parts(
            bind_group,
            BindGroupResource::ShadowDepth {
                texture,
                view,
                sampler,
                size,
            },
        )
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    #[inline]
    #[must_use]
    pub fn resource(&self) -> &BindGroupResource {
        &self.resource
    }

    /// Uniform buffer of this group, if it owns one.
    #[must_use]
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        match &self.resource {
            BindGroupResource::Uniform(buffer) | BindGroupResource::Material { buffer, .. } => {
                Some(buffer)
            }
            _ => None,
        }
    }

    /// Depth view to render into, for shadow depth groups.
    #[must_use]
    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        match &self.resource {
            BindGroupResource::ShadowDepth { view, .. } => Some(view),
            _ => None,
        }
    }

    /// Writes `value` into the owned uniform buffer. No-op for groups without one.
    pub fn write<T: Pod>(&self, gpu: &GpuDataInterface, value: &T) {
        if let Some(buffer) = self.buffer() {
            gpu.write_uniform(buffer, value);
        }
    }
}

impl Drop for BindGroupData {
    fn drop(&mut self) {
        match &self.resource {
            BindGroupResource::Uniform(buffer) | BindGroupResource::Material { buffer, .. } => {
                buffer.destroy();
            }
            BindGroupResource::ShadowDepth { texture, .. } => texture.destroy(),
            BindGroupResource::Texture { .. } => {}
        }
    }
}
