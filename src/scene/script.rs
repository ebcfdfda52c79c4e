use slotmap::SlotMap;

use crate::app::events::EventManager;
use crate::app::input::InputManager;
use crate::assets::manager::AssetManager;
use crate::scene::{
    Component, ComponentSet, ComponentType, EntityKey, Scene, ScriptKey, TransformComponent, World,
};

/// Per-entity behavior driven by the engine's frame loop.
///
/// Hooks run in this order: `on_create` when the script is attached to an
/// entity, `on_init` on the first frame it is executed, `on_update` on every
/// later frame and `on_destroy` on explicit teardown.
pub trait Script {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn on_create(&mut self, _entity: EntityKey) {}

    fn on_init(&mut self, _ctx: &mut ScriptContext<'_>) {}

    fn on_update(&mut self, _ctx: &mut ScriptContext<'_>) {}

    fn on_destroy(&mut self, _ctx: &mut ScriptContext<'_>) {}
}

/// Engine state a script may touch while it runs.
pub struct ScriptContext<'a> {
    /// Entity owning the running script.
    pub entity: EntityKey,
    pub world: &'a mut World,
    pub scene: &'a Scene,
    pub input: &'a InputManager,
    pub events: &'a mut EventManager,
    pub assets: &'a AssetManager,
    /// Seconds since engine start.
    pub time: f32,
    /// Seconds since the previous frame.
    pub dt: f32,
}

impl ScriptContext<'_> {
    /// Transform of the running script's entity.
    pub fn transform_mut(&mut self) -> Option<&mut TransformComponent> {
        self.world.get_component_mut::<TransformComponent>(self.entity).ok()
    }
}

pub(crate) struct ScriptSlot {
    pub(crate) script: Box<dyn Script>,
    pub(crate) created: bool,
    pub(crate) initialized: bool,
}

#[derive(Default)]
pub struct ScriptComponent {
    pub(crate) scripts: Vec<ScriptSlot>,
    pub(crate) entity: EntityKey,
}

impl ScriptComponent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, script: impl Script + 'static) -> Self {
        self.add(script);
        self
    }

    /// Adds a script. If the component is already attached, `on_create`
    /// runs immediately; otherwise it runs at attach time.
    pub fn add(&mut self, script: impl Script + 'static) {
        let mut slot = ScriptSlot {
            script: Box::new(script),
            created: false,
            initialized: false,
        };
        if self.entity != EntityKey::default() {
            slot.script.on_create(self.entity);
            slot.created = true;
        }
        self.scripts.push(slot);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.iter().map(|s| s.script.name())
    }
}

impl Component for ScriptComponent {
    const TYPE: ComponentType = ComponentType::Script;
    type Key = ScriptKey;

    fn arena(world: &World) -> &SlotMap<ScriptKey, Self> {
        &world.scripts
    }

    fn arena_mut(world: &mut World) -> &mut SlotMap<ScriptKey, Self> {
        &mut world.scripts
    }

    fn slot(set: &ComponentSet) -> Option<ScriptKey> {
        set.script
    }

    fn slot_mut(set: &mut ComponentSet) -> &mut Option<ScriptKey> {
        &mut set.script
    }

    fn entity(&self) -> EntityKey {
        self.entity
    }

    /// Attaching runs `on_create` for every script not created yet.
    fn set_entity(&mut self, entity: EntityKey) {
        self.entity = entity;
        for slot in self.scripts.iter_mut().filter(|s| !s.created) {
            slot.script.on_create(entity);
            slot.created = true;
        }
    }
}
