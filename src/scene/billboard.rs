use crate::assets::loader::AssetHandle;
use crate::assets::texture::TextureSource;
use crate::errors::{EngineError, Result};
use crate::renderer::gpu::GpuDataInterface;
use crate::resources::bind_group::BindGroupData;
use crate::resources::slot::GpuSlot;
use crate::scene::{BillboardKey, EntityKey, impl_component};

/// Camera-facing textured quad drawn at the entity's position.
#[derive(Debug)]
pub struct BillboardComponent {
    texture: AssetHandle<TextureSource>,
    pub(crate) entity: EntityKey,
    pub(crate) bind_group: GpuSlot<BindGroupData>,
}

impl_component!(BillboardComponent, BillboardKey, Billboard, billboards, billboard);

impl BillboardComponent {
    #[must_use]
    pub fn new(texture: AssetHandle<TextureSource>) -> Self {
        Self {
            texture,
            entity: EntityKey::default(),
            bind_group: GpuSlot::new(),
        }
    }

    #[must_use]
    pub fn texture(&self) -> &AssetHandle<TextureSource> {
        &self.texture
    }

    /// Swaps the texture; the bind group is rebuilt on next use.
    pub fn set_texture(&mut self, texture: AssetHandle<TextureSource>) {
        drop(self.bind_group.unload());
        self.texture = texture;
    }

    #[must_use]
    pub fn bind_group(&self) -> Option<&BindGroupData> {
        self.bind_group.get()
    }

    pub fn ensure_bind_group(&mut self, gpu: &GpuDataInterface) -> Result<&BindGroupData> {
        let texture = &self.texture;
        let data = self.bind_group.ensure_loaded(|| {
            let payload = texture.get(gpu)?;
            Ok::<_, EngineError>(BindGroupData::texture(
                gpu,
                &gpu.layouts().texture,
                "Billboard",
                &payload.view,
            ))
        })?;
        Ok(&*data)
    }

    pub(crate) fn release_gpu(&mut self) {
        drop(self.bind_group.unload());
    }
}
