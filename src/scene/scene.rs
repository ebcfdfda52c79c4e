use std::collections::BTreeMap;

use crate::errors::{EngineError, Result};
use crate::scene::{
    CameraComponent, ComponentSet, ComponentType, EntityKey, TransformComponent, TransformProps,
    World,
};

/// One query result: an entity plus the keys of the requested components.
///
/// Slots for types that were not requested are always `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRecord {
    pub entity: EntityKey,
    pub components: ComponentSet,
}

/// A named set of entities.
///
/// Entities are referenced by key, so several scenes may contain the same
/// entity (see [`SceneManager::add_scene_copy`](crate::scene::SceneManager::add_scene_copy)).
/// Iteration order is the lexical order of entity ids.
#[derive(Debug, Clone)]
pub struct Scene {
    id: String,
    pub name: String,
    entities: BTreeMap<String, EntityKey>,
    active_camera: Option<String>,
}

impl Scene {
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            entities: BTreeMap::new(),
            active_camera: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Creates an entity with a Transform and adds it under `id`. An existing
    /// entity with that id is replaced (with a warning) and destroyed along
    /// with the components only it used.
    pub fn create_entity(&mut self, world: &mut World, id: &str, transform: TransformProps) -> Result<EntityKey> {
        let key = world.create_entity(id);
        if let Err(err) = world.add_component(key, TransformComponent::new(transform)) {
            world.destroy_entity(key);
            return Err(err);
        }
        if let Some(old) = self.add_entity(id, key) {
            world.destroy_entity(old);
        }
        Ok(key)
    }

    /// Adds an existing entity under `id`, replacing (with a warning) any
    /// entity already registered under it. The replaced key is returned and
    /// left alive in the world.
    pub fn add_entity(&mut self, id: &str, entity: EntityKey) -> Option<EntityKey> {
        let old = self
            .entities
            .insert(id.to_string(), entity)
            .filter(|&old| old != entity);
        if old.is_some() {
            log::warn!("Entity '{id}' already exists in scene '{}', overwriting", self.id);
        }
        old
    }

    /// Empties the scene and destroys its entities in `world`.
    pub fn destroy_entities(&mut self, world: &mut World) {
        for (_, entity) in std::mem::take(&mut self.entities) {
            world.destroy_entity(entity);
        }
        self.active_camera = None;
    }

    pub fn remove_entity(&mut self, id: &str) -> Option<EntityKey> {
        if self.active_camera.as_deref() == Some(id) {
            self.active_camera = None;
        }
        self.entities.remove(id)
    }

    pub fn get_entity(&self, id: &str) -> Result<EntityKey> {
        self.get_entity_or_none(id)
            .ok_or_else(|| EngineError::UnknownEntity {
                scene: self.id.clone(),
                entity: id.to_string(),
            })
    }

    #[must_use]
    pub fn get_entity_or_none(&self, id: &str) -> Option<EntityKey> {
        self.entities.get(id).copied()
    }

    #[must_use]
    pub fn has_entity(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// `(id, key)` pairs in id order.
    pub fn entities(&self) -> impl Iterator<Item = (&str, EntityKey)> {
        self.entities.iter().map(|(id, key)| (id.as_str(), *key))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Every entity carrying all of `types`, with its record reduced to
    /// those types. An empty `types` matches every entity.
    ///
    /// Recomputed on each call; cost is linear in the entity count.
    #[must_use]
    pub fn get_components(&self, world: &World, types: &[ComponentType]) -> Vec<ComponentRecord> {
        self.entities
            .values()
            .filter_map(|&key| {
                let set = world.entity(key)?.components();
                types.iter().all(|ty| set.has(*ty)).then(|| ComponentRecord {
                    entity: key,
                    components: set.reduced(types),
                })
            })
            .collect()
    }

    // ========================================================================
    // Camera
    // ========================================================================

    /// Selects the camera entity rendered from. The entity must exist in
    /// this scene and carry a Camera.
    pub fn set_active_camera(&mut self, world: &World, id: &str) -> Result<()> {
        let entity = self.get_entity(id)?;
        world.get_component::<CameraComponent>(entity)?;
        self.active_camera = Some(id.to_string());
        Ok(())
    }

    /// The selected camera, or the first camera entity in id order.
    #[must_use]
    pub fn active_camera(&self, world: &World) -> Option<EntityKey> {
        if let Some(id) = &self.active_camera
            && let Some(entity) = self.get_entity_or_none(id)
            && world.has_component::<CameraComponent>(entity)
        {
            return Some(entity);
        }
        self.get_components(world, &[ComponentType::Camera])
            .first()
            .map(|record| record.entity)
    }
}
