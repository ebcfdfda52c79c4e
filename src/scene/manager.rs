use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::errors::{EngineError, Result};
use crate::scene::{ComponentType, Scene, TransformComponent, TransformKey, World};

/// Scene registry and active-scene selection.
///
/// The manager stores scenes only; entity and component data live in the
/// [`World`] passed to the operations that need it, so several managers can
/// share one world.
#[derive(Default)]
pub struct SceneManager {
    scenes: FxHashMap<String, Scene>,
    active_scene: Option<String>,
}

impl SceneManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scene, replacing (with a warning) any scene with the same id.
    pub fn create_scene(&mut self, id: &str, name: &str) -> &mut Scene {
        self.add_scene(Scene::new(id, name))
    }

    pub fn add_scene(&mut self, scene: Scene) -> &mut Scene {
        match self.scenes.entry(scene.id().to_string()) {
            Entry::Occupied(mut entry) => {
                log::warn!("Scene '{}' already exists, overwriting", entry.key());
                entry.insert(scene);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(scene),
        }
    }

    /// Registers a shallow copy of `scene`: same id and name, same entity
    /// keys. Components mutated through one are visible through the other.
    pub fn add_scene_copy(&mut self, scene: &Scene) -> &mut Scene {
        self.add_scene(scene.clone())
    }

    pub fn remove_scene(&mut self, id: &str) -> Option<Scene> {
        if self.active_scene.as_deref() == Some(id) {
            self.active_scene = None;
            log::warn!("Active scene '{id}' was removed, nothing will be rendered");
        }
        self.scenes.remove(id)
    }

    /// Removes the scene and destroys its entities. Components shared with
    /// instanced copies in other scenes stay alive.
    pub fn destroy_scene(&mut self, world: &mut World, id: &str) -> bool {
        match self.remove_scene(id) {
            Some(mut scene) => {
                scene.destroy_entities(world);
                true
            }
            None => false,
        }
    }

    pub fn get_scene(&self, id: &str) -> Result<&Scene> {
        self.scenes
            .get(id)
            .ok_or_else(|| EngineError::UnknownScene(id.to_string()))
    }

    pub fn get_scene_mut(&mut self, id: &str) -> Result<&mut Scene> {
        self.scenes
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownScene(id.to_string()))
    }

    #[must_use]
    pub fn get_scene_or_none(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    #[must_use]
    pub fn has_scene(&self, id: &str) -> bool {
        self.scenes.contains_key(id)
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }

    // ========================================================================
    // Active scene
    // ========================================================================

    pub fn set_active_scene(&mut self, id: &str) -> Result<()> {
        if !self.scenes.contains_key(id) {
            return Err(EngineError::UnknownScene(id.to_string()));
        }
        self.active_scene = Some(id.to_string());
        Ok(())
    }

    #[must_use]
    pub fn active_scene_id(&self) -> Option<&str> {
        self.active_scene.as_deref()
    }

    #[must_use]
    pub fn active_scene(&self) -> Option<&Scene> {
        self.active_scene.as_deref().and_then(|id| self.scenes.get(id))
    }

    pub fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        let id = self.active_scene.as_deref()?;
        self.scenes.get_mut(id)
    }

    // ========================================================================
    // Instancing
    // ========================================================================

    /// Instantiates every entity of `source` into the scene `target_id`.
    ///
    /// Each instanced entity keeps its id, gets a fresh Transform copied from
    /// the source one, and shares every other component by key. Source roots
    /// are parented under the Transform of `parent_id` (an entity of the
    /// target scene) when given; parents inside `source` are remapped to
    /// their instanced copies.
    ///
    /// Nothing is created when an id already exists in the target.
    pub fn instance_scene(
        &mut self,
        world: &mut World,
        source: &Scene,
        target_id: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        let target = self
            .scenes
            .get_mut(target_id)
            .ok_or_else(|| EngineError::UnknownScene(target_id.to_string()))?;

        if let Some((id, _)) = source.entities().find(|(id, _)| target.has_entity(id)) {
            return Err(EngineError::DuplicateEntity {
                scene: target_id.to_string(),
                entity: id.to_string(),
            });
        }

        let root_parent = match parent_id {
            Some(parent_id) => {
                let parent = target.get_entity(parent_id)?;
                Some(
                    world
                        .component_key::<TransformComponent>(parent)
                        .ok_or_else(|| EngineError::MissingComponent {
                            entity: parent_id.to_string(),
                            component: ComponentType::Transform,
                        })?,
                )
            }
            None => None,
        };

        let mut remap: FxHashMap<TransformKey, TransformKey> = FxHashMap::default();
        let mut copies: Vec<TransformKey> = Vec::new();

        for (id, source_entity) in source.entities() {
            let entity = world.create_entity(id);
            world.share_components(source_entity, entity);

            if let Some(source_transform) = world.component_key::<TransformComponent>(source_entity)
                && let Some(props) = world.get::<TransformComponent>(source_transform).map(|t| t.props)
            {
                let copy = world.add_component(entity, TransformComponent::new(props))?;
                remap.insert(source_transform, copy);
                copies.push(copy);
            }

            target.add_entity(id, entity);
        }

        for copy in copies {
            if let Some(transform) = world.get_mut::<TransformComponent>(copy) {
                let parent = match transform.props.parent {
                    Some(parent) => Some(remap.get(&parent).copied().unwrap_or(parent)),
                    None => root_parent,
                };
                transform.set_parent(parent);
            }
        }

        Ok(())
    }
}
