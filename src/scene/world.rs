use slotmap::SlotMap;

use crate::errors::{EngineError, Result};
use crate::scene::{
    BillboardComponent, BillboardKey, CameraComponent, CameraKey, Component, ComponentSet,
    ComponentType, Entity, EntityKey, LightComponent, LightKey, MeshRendererComponent,
    MeshRendererKey, ScriptComponent, ScriptKey, ShadowMapComponent, ShadowMapKey,
    TransformComponent, TransformKey,
};

/// Arena storage for every entity and component.
///
/// Scenes hold [`EntityKey`]s into this world; entities hold one key per
/// component type. Component arenas are accessed generically through the
/// [`Component`] trait:
///
/// ```rust,ignore
/// let camera: &CameraComponent = world.get_component(entity)?;
/// let maybe_light = world.get_component_or_none::<LightComponent>(entity);
/// ```
#[derive(Default)]
pub struct World {
    pub(crate) entities: SlotMap<EntityKey, Entity>,
    pub(crate) transforms: SlotMap<TransformKey, TransformComponent>,
    pub(crate) cameras: SlotMap<CameraKey, CameraComponent>,
    pub(crate) lights: SlotMap<LightKey, LightComponent>,
    pub(crate) mesh_renderers: SlotMap<MeshRendererKey, MeshRendererComponent>,
    pub(crate) shadow_maps: SlotMap<ShadowMapKey, ShadowMapComponent>,
    pub(crate) billboards: SlotMap<BillboardKey, BillboardComponent>,
    pub(crate) scripts: SlotMap<ScriptKey, ScriptComponent>,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Creates an entity with no components. Ids are not unique at the world
    /// level; uniqueness is enforced per scene.
    pub fn create_entity(&mut self, id: &str) -> EntityKey {
        self.entities.insert(Entity::new(id))
    }

    #[inline]
    #[must_use]
    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Removes the entity and its components. Components still linked by
    /// another entity (instanced copies) stay alive. Returns `false` for a
    /// dangling key.
    pub fn destroy_entity(&mut self, entity: EntityKey) -> bool {
        if !self.entities.contains_key(entity) {
            return false;
        }
        drop(self.remove_component::<TransformComponent>(entity));
        drop(self.remove_component::<CameraComponent>(entity));
        drop(self.remove_component::<LightComponent>(entity));
        drop(self.remove_component::<MeshRendererComponent>(entity));
        drop(self.remove_component::<ShadowMapComponent>(entity));
        drop(self.remove_component::<BillboardComponent>(entity));
        drop(self.remove_component::<ScriptComponent>(entity));
        self.entities.remove(entity).is_some()
    }

    /// Id of a live entity, or `"<dangling>"`.
    #[must_use]
    pub fn entity_id(&self, key: EntityKey) -> &str {
        self.entities.get(key).map_or("<dangling>", Entity::id)
    }

    /// Component types present on the entity (empty for a dangling key).
    #[must_use]
    pub fn component_types(&self, entity: EntityKey) -> Vec<ComponentType> {
        self.entities
            .get(entity)
            .map(Entity::component_types)
            .unwrap_or_default()
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Attaches `component` to `entity`, replacing (with a warning) any
    /// component of the same type that was already attached.
    pub fn add_component<C: Component>(&mut self, entity: EntityKey, mut component: C) -> Result<C::Key> {
        let Some(record) = self.entities.get(entity) else {
            return Err(EngineError::DanglingEntity(entity));
        };

        if let Some(old) = C::slot(&record.components) {
            log::warn!(
                "Entity '{}' already has a {} component, replacing it",
                record.id,
                C::TYPE.name()
            );
            self.release_if_unshared::<C>(entity, old);
        }

        component.set_entity(entity);
        let key = C::arena_mut(self).insert(component);
        if let Some(record) = self.entities.get_mut(entity) {
            *C::slot_mut(&mut record.components) = Some(key);
        }
        Ok(key)
    }

    /// Detaches the component of type `C`. The component is removed from its
    /// arena only when no other entity still links to it.
    pub fn remove_component<C: Component>(&mut self, entity: EntityKey) -> Option<C> {
        let record = self.entities.get_mut(entity)?;
        let key = C::slot_mut(&mut record.components).take()?;
        if self.is_linked::<C>(key) {
            None
        } else {
            C::arena_mut(self).remove(key)
        }
    }

    /// Returns the entity's component of type `C`.
    pub fn get_component<C: Component>(&self, entity: EntityKey) -> Result<&C> {
        self.get_component_or_none(entity)
            .ok_or_else(|| self.missing::<C>(entity))
    }

    pub fn get_component_mut<C: Component>(&mut self, entity: EntityKey) -> Result<&mut C> {
        match self.component_key::<C>(entity) {
            Some(key) if C::arena(self).contains_key(key) => Ok(&mut C::arena_mut(self)[key]),
            _ => Err(self.missing::<C>(entity)),
        }
    }

    #[must_use]
    pub fn get_component_or_none<C: Component>(&self, entity: EntityKey) -> Option<&C> {
        let key = self.component_key::<C>(entity)?;
        C::arena(self).get(key)
    }

    #[must_use]
    pub fn has_component<C: Component>(&self, entity: EntityKey) -> bool {
        self.get_component_or_none::<C>(entity).is_some()
    }

    /// Arena key of the entity's component of type `C`.
    #[must_use]
    pub fn component_key<C: Component>(&self, entity: EntityKey) -> Option<C::Key> {
        C::slot(&self.entities.get(entity)?.components)
    }

    /// Direct arena access by component key.
    #[inline]
    #[must_use]
    pub fn get<C: Component>(&self, key: C::Key) -> Option<&C> {
        C::arena(self).get(key)
    }

    #[inline]
    pub fn get_mut<C: Component>(&mut self, key: C::Key) -> Option<&mut C> {
        C::arena_mut(self).get_mut(key)
    }

    /// Iterates every live component of type `C`, across all scenes.
    pub fn iter<C: Component>(&self) -> impl Iterator<Item = (C::Key, &C)> {
        C::arena(self).iter()
    }

    pub fn iter_mut<C: Component>(&mut self) -> impl Iterator<Item = (C::Key, &mut C)> {
        C::arena_mut(self).iter_mut()
    }

    /// Drops every component's GPU objects (device loss). They are
    /// recreated lazily on next use.
    pub(crate) fn release_gpu(&mut self) {
        self.transforms.values_mut().for_each(TransformComponent::release_gpu);
        self.cameras.values_mut().for_each(CameraComponent::release_gpu);
        self.lights.values_mut().for_each(LightComponent::release_gpu);
        self.shadow_maps.values_mut().for_each(ShadowMapComponent::release_gpu);
        self.billboards.values_mut().for_each(BillboardComponent::release_gpu);
    }

    /// Links every non-Transform component of `from` onto `to` by key.
    ///
    /// Used by scene instancing: the linked components are shared, so a
    /// mutation through either entity is visible through both.
    pub(crate) fn share_components(&mut self, from: EntityKey, to: EntityKey) {
        let Some(source) = self.entities.get(from).map(|e| e.components) else {
            return;
        };
        if let Some(target) = self.entities.get_mut(to) {
            target.components = ComponentSet {
                transform: target.components.transform,
                ..source
            };
        }
    }

    fn is_linked<C: Component>(&self, key: C::Key) -> bool {
        self.entities
            .values()
            .any(|e| C::slot(&e.components) == Some(key))
    }

    fn release_if_unshared<C: Component>(&mut self, entity: EntityKey, key: C::Key) {
        let shared = self
            .entities
            .iter()
            .any(|(k, e)| k != entity && C::slot(&e.components) == Some(key));
        if !shared {
            C::arena_mut(self).remove(key);
        }
    }

    fn missing<C: Component>(&self, entity: EntityKey) -> EngineError {
        EngineError::MissingComponent {
            entity: self.entity_id(entity).to_string(),
            component: C::TYPE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{CameraProps, TransformProps};

    #[test]
    fn add_component_replaces_same_type() {
        let mut world = World::new();
        let e = world.create_entity("node");
        let first = world
            .add_component(e, TransformComponent::new(TransformProps::default()))
            .unwrap();
        let second = world
            .add_component(e, TransformComponent::new(TransformProps::default()))
            .unwrap();

        assert_ne!(first, second);
        assert!(world.get::<TransformComponent>(first).is_none());
        assert_eq!(world.component_key::<TransformComponent>(e), Some(second));
        assert_eq!(world.iter::<TransformComponent>().count(), 1);
    }

    #[test]
    fn replacing_shared_component_keeps_the_other_link_alive() {
        let mut world = World::new();
        let a = world.create_entity("a");
        let b = world.create_entity("b");
        let cam = world
            .add_component(a, CameraComponent::new(CameraProps::default()))
            .unwrap();
        world.share_components(a, b);

        world
            .add_component(a, CameraComponent::new(CameraProps::default()))
            .unwrap();

        assert_eq!(world.component_key::<CameraComponent>(b), Some(cam));
        assert!(world.get::<CameraComponent>(cam).is_some());
    }

    #[test]
    fn dangling_entity_is_reported() {
        let mut world = World::new();
        let e = world.create_entity("gone");
        world.entities.remove(e);
        let err = world
            .add_component(e, TransformComponent::new(TransformProps::default()))
            .unwrap_err();
        assert!(matches!(err, EngineError::DanglingEntity(_)));
    }

    #[test]
    fn destroy_entity_releases_unshared_components() {
        let mut world = World::new();
        let a = world.create_entity("a");
        let b = world.create_entity("b");
        let transform = world
            .add_component(a, TransformComponent::new(TransformProps::default()))
            .unwrap();
        let cam = world
            .add_component(a, CameraComponent::new(CameraProps::default()))
            .unwrap();
        world.share_components(a, b);

        assert!(world.destroy_entity(a));
        assert!(!world.destroy_entity(a));
        assert_eq!(world.entity_count(), 1);
        assert!(world.get::<TransformComponent>(transform).is_none());
        // Still linked by the instanced copy.
        assert!(world.get::<CameraComponent>(cam).is_some());

        assert!(world.destroy_entity(b));
        assert!(world.get::<CameraComponent>(cam).is_none());
    }
}
