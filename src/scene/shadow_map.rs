use crate::errors::{EngineError, Result};
use crate::renderer::gpu::GpuDataInterface;
use crate::resources::bind_group::BindGroupData;
use crate::resources::slot::GpuSlot;
use crate::scene::{EntityKey, ShadowMapKey, impl_component};

/// Square depth target a shadow-casting sun light renders into.
#[derive(Debug)]
pub struct ShadowMapComponent {
    size: u32,
    pub(crate) entity: EntityKey,
    pub(crate) bind_group: GpuSlot<BindGroupData>,
}

impl_component!(ShadowMapComponent, ShadowMapKey, ShadowMap, shadow_maps, shadow_map);

impl Default for ShadowMapComponent {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

impl ShadowMapComponent {
    pub const DEFAULT_SIZE: u32 = 2048;

    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            size: size.max(1),
            entity: EntityKey::default(),
            bind_group: GpuSlot::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Changes the resolution. The current depth target is released now and
    /// a new one is created on next use.
    pub fn set_size(&mut self, size: u32) {
        drop(resize_target(&mut self.size, size, &mut self.bind_group));
    }

    #[must_use]
    pub fn bind_group(&self) -> Option<&BindGroupData> {
        self.bind_group.get()
    }

    pub fn ensure_bind_group(&mut self, gpu: &GpuDataInterface) -> Result<&BindGroupData> {
        let size = self.size;
        let data = self.bind_group.ensure_loaded(|| {
            Ok::<_, EngineError>(BindGroupData::shadow_depth(
                gpu,
                &gpu.layouts().shadow_map,
                "Shadow Map",
                size,
            ))
        })?;
        Ok(&*data)
    }

    pub(crate) fn release_gpu(&mut self) {
        drop(self.bind_group.unload());
    }
}

/// Applies a requested resolution (clamped to 1) and hands back the depth
/// target built for the old one. A same-size request keeps the cached target.
fn resize_target<T>(current: &mut u32, requested: u32, slot: &mut GpuSlot<T>) -> Option<T> {
    let requested = requested.max(1);
    if requested == *current {
        return None;
    }
    *current = requested;
    slot.unload()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Target(Rc<Cell<u32>>);

    impl Drop for Target {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn loaded(destroyed: &Rc<Cell<u32>>) -> GpuSlot<Target> {
        let mut slot = GpuSlot::new();
        slot.replace(Target(destroyed.clone()));
        slot
    }

    #[test]
    fn same_size_keeps_the_cached_target() {
        let destroyed = Rc::new(Cell::new(0));
        let mut slot = loaded(&destroyed);
        let mut size = 1024;

        drop(resize_target(&mut size, 1024, &mut slot));

        assert!(slot.is_loaded());
        assert_eq!(size, 1024);
        assert_eq!(destroyed.get(), 0);
    }

    #[test]
    fn new_size_destroys_the_old_target_once() {
        let destroyed = Rc::new(Cell::new(0));
        let mut slot = loaded(&destroyed);
        let mut size = 1024;

        drop(resize_target(&mut size, 512, &mut slot));
        assert!(!slot.is_loaded());
        assert_eq!(size, 512);
        assert_eq!(destroyed.get(), 1);

        // Nothing left to release on a second resize.
        drop(resize_target(&mut size, 256, &mut slot));
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn zero_size_is_clamped() {
        let destroyed = Rc::new(Cell::new(0));
        let mut slot = loaded(&destroyed);
        let mut size = 1;

        drop(resize_target(&mut size, 0, &mut slot));
        assert!(slot.is_loaded());
        assert_eq!(size, 1);
    }

    #[test]
    fn component_resize_updates_size_and_stays_unloaded() {
        let mut shadow_map = ShadowMapComponent::default();
        assert_eq!(shadow_map.size(), ShadowMapComponent::DEFAULT_SIZE);

        shadow_map.set_size(ShadowMapComponent::DEFAULT_SIZE);
        shadow_map.set_size(4096);
        assert_eq!(shadow_map.size(), 4096);
        assert!(shadow_map.bind_group().is_none());
    }
}
